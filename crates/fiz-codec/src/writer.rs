//! Builder for framed output.

use crate::{CLOSE, LENGTH_TERMINATOR, OPEN};

/// Accumulates length-prefixed fields and structural delimiters.
#[derive(Debug, Clone, Default)]
pub struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Append `bytes` as a `DEC "." BYTES` field.
    pub fn field(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes.len().to_string().as_bytes());
        self.buf.push(LENGTH_TERMINATOR);
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a text field.
    pub fn str_field(&mut self, value: &str) -> &mut Self {
        self.field(value.as_bytes())
    }

    /// Open a nested structure.
    pub fn open(&mut self) -> &mut Self {
        self.buf.push(OPEN);
        self
    }

    /// Close a nested structure.
    pub fn close(&mut self) -> &mut Self {
        self.buf.push(CLOSE);
        self
    }

    /// Append already-framed bytes verbatim.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldReader;

    #[test]
    fn test_field_layout() {
        let mut writer = FieldWriter::new();
        writer.str_field("name").open().str_field("").close();
        assert_eq!(writer.as_bytes(), b"4.name(0.)");
    }

    #[test]
    fn test_length_counts_bytes() {
        let mut writer = FieldWriter::new();
        writer.str_field("héllo");
        assert_eq!(writer.as_bytes(), "6.héllo".as_bytes());
    }

    #[test]
    fn test_binary_field_is_read_back() {
        let payload = [0u8, b'(', b'.', 255, b')'];
        let mut writer = FieldWriter::with_capacity(16);
        writer.field(&payload).raw(b"1.z");

        let bytes = writer.into_bytes();
        let mut reader = FieldReader::new(&bytes);
        assert_eq!(reader.read_field().unwrap(), &payload);
        assert_eq!(reader.read_str().unwrap(), "z");
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_empty_writer() {
        let writer = FieldWriter::new();
        assert!(writer.is_empty());
        assert_eq!(writer.len(), 0);
    }
}
