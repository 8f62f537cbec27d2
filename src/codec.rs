//! Canonical dataset encoding
//!
//! A dataset is written as `(` followed by one key/value pair per stored
//! value and a closing `)`. Keys and string values are length-prefixed
//! fields (`DEC "." BYTES`); a nested dataset is another parenthesized
//! group. Repeated values under a key repeat the key, in order:
//!
//! ```text
//! (4.name5.Alice5.child(2.id1.1)5.child(2.id1.2))
//! ```
//!
//! Nothing is escaped. The reader never searches for a delimiter inside a
//! field, so any byte may appear in keys and values. Lengths count bytes of
//! the UTF-8 encoding.

use fiz_codec::{CodecError, FieldReader, FieldWriter, CLOSE, OPEN};

use crate::dataset::{Dataset, Value};
use crate::error::{DatasetError, DatasetResult};

/// Deepest nesting accepted when decoding.
pub const MAX_DEPTH: usize = 128;

/// Encode `dataset`, invoking any lazy sources it holds.
pub fn serialize(dataset: &Dataset) -> DatasetResult<Vec<u8>> {
    let mut writer = FieldWriter::new();
    write_tree(&mut writer, dataset)?;
    Ok(writer.into_bytes())
}

/// Encode `dataset` as text.
///
/// The encoding is valid UTF-8 whenever the keys and values are, which
/// always holds for a [`Dataset`].
pub fn serialize_to_string(dataset: &Dataset) -> DatasetResult<String> {
    let bytes = serialize(dataset)?;
    String::from_utf8(bytes)
        .map_err(|e| DatasetError::Internal(format!("encoded dataset is not UTF-8: {}", e)))
}

/// Decode a complete encoding. Trailing bytes are a syntax error.
pub fn deserialize(input: &[u8]) -> DatasetResult<Dataset> {
    let mut reader = FieldReader::new(input);
    let dataset = read_tree(&mut reader)?;
    reader.finish()?;
    Ok(dataset)
}

impl Dataset {
    /// See [`serialize`].
    pub fn serialize(&self) -> DatasetResult<Vec<u8>> {
        serialize(self)
    }

    /// See [`deserialize`].
    pub fn deserialize(input: &[u8]) -> DatasetResult<Self> {
        deserialize(input)
    }
}

/// Write `dataset` as a parenthesized group.
pub(crate) fn write_tree(writer: &mut FieldWriter, dataset: &Dataset) -> DatasetResult<()> {
    writer.open();
    for (key, values) in dataset.entries()? {
        for value in values {
            writer.str_field(&key);
            match value {
                Value::String(s) => {
                    writer.str_field(&s);
                }
                Value::Dataset(child) => write_tree(writer, &child)?,
            }
        }
    }
    writer.close();
    Ok(())
}

/// Read one parenthesized group.
pub(crate) fn read_tree(reader: &mut FieldReader<'_>) -> DatasetResult<Dataset> {
    Ok(read_group(reader, 0)?)
}

fn read_group(reader: &mut FieldReader<'_>, depth: usize) -> Result<Dataset, CodecError> {
    if depth >= MAX_DEPTH {
        return Err(CodecError::TooDeep {
            offset: reader.position(),
            limit: MAX_DEPTH,
        });
    }
    reader.expect(OPEN)?;

    let mut dataset = Dataset::new();
    loop {
        match reader.peek() {
            Some(CLOSE) => {
                reader.expect(CLOSE)?;
                return Ok(dataset);
            }
            None => {
                return Err(CodecError::Truncated {
                    offset: reader.position(),
                    context: "dataset",
                })
            }
            Some(_) => {}
        }

        let key_offset = reader.position();
        let key = reader.read_str()?;
        if key.is_empty() {
            return Err(CodecError::EmptyKey { offset: key_offset });
        }

        let value = if reader.peek() == Some(OPEN) {
            Value::from(read_group(reader, depth + 1)?)
        } else {
            Value::from(reader.read_str()?)
        };
        dataset.push_value(key.to_string(), value);
    }
}
