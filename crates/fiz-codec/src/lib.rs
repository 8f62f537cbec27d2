//! Length-prefixed framing
//!
//! Every string on the wire is written as `DEC "." BYTES`, where `DEC` is the
//! decimal byte count of `BYTES` (no sign, no leading zeros other than `0`
//! itself). Because the length is explicit, no byte inside a field is ever
//! escaped. Nested structures are wrapped in `(` and `)`; those delimiters are
//! unambiguous because they only ever appear where a length field could start.
//!
//! This crate knows nothing about datasets. It provides the field writer and
//! the forward-only field reader that the dataset codec and the reminder
//! envelope are built on.

mod error;
mod reader;
mod writer;

pub use error::{CodecError, CodecResult};
pub use reader::FieldReader;
pub use writer::FieldWriter;

/// Opens a nested structure.
pub const OPEN: u8 = b'(';

/// Closes a nested structure.
pub const CLOSE: u8 = b')';

/// Separates a length field from the bytes it counts.
pub const LENGTH_TERMINATOR: u8 = b'.';

/// Longest accepted length field, in digits.
pub const MAX_LENGTH_DIGITS: usize = 19;
