//! Forward-only reader for framed input.

use crate::error::{CodecError, CodecResult};
use crate::{LENGTH_TERMINATOR, MAX_LENGTH_DIGITS};

/// Reads length-prefixed fields and structural bytes from a buffer in a
/// single forward scan.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Create a reader positioned at the start of `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// True once every byte has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Unread bytes, without consuming them.
    pub fn rest(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Next byte, without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Consume `byte` if it is next. Returns whether it was consumed.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume `byte`, failing if anything else (or nothing) is next.
    pub fn expect(&mut self, byte: u8) -> CodecResult<()> {
        match self.peek() {
            Some(found) if found == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(CodecError::Unexpected {
                offset: self.pos,
                expected: byte as char,
                found: found as char,
            }),
            None => Err(CodecError::Truncated {
                offset: self.pos,
                context: "structural delimiter",
            }),
        }
    }

    /// Read a `DEC "."` length field and return its value.
    ///
    /// The field must be non-empty, unsigned, and free of leading zeros
    /// (except for `0` itself).
    pub fn read_length(&mut self) -> CodecResult<usize> {
        let start = self.pos;
        let digits = self.input[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();

        if digits == 0 {
            return match self.peek() {
                None => Err(CodecError::Truncated {
                    offset: start,
                    context: "length field",
                }),
                Some(found) => Err(CodecError::BadLength {
                    offset: start,
                    reason: format!("expected a digit, found '{}'", found as char),
                }),
            };
        }
        if digits > MAX_LENGTH_DIGITS {
            return Err(CodecError::BadLength {
                offset: start,
                reason: format!("more than {} digits", MAX_LENGTH_DIGITS),
            });
        }
        if digits > 1 && self.input[start] == b'0' {
            return Err(CodecError::BadLength {
                offset: start,
                reason: "leading zero".to_string(),
            });
        }

        let mut value: usize = 0;
        for &digit in &self.input[start..start + digits] {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(usize::from(digit - b'0')))
                .ok_or_else(|| CodecError::BadLength {
                    offset: start,
                    reason: "value overflows".to_string(),
                })?;
        }
        self.pos += digits;

        match self.peek() {
            Some(LENGTH_TERMINATOR) => {
                self.pos += 1;
                Ok(value)
            }
            Some(found) => Err(CodecError::Unexpected {
                offset: self.pos,
                expected: LENGTH_TERMINATOR as char,
                found: found as char,
            }),
            None => Err(CodecError::Truncated {
                offset: self.pos,
                context: "length terminator",
            }),
        }
    }

    /// Consume exactly `len` bytes.
    pub fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(CodecError::LengthOverrun {
                offset: self.pos,
                declared: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Read one complete `DEC "." BYTES` field.
    pub fn read_field(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_length()?;
        self.take(len)
    }

    /// Read one field and require it to be UTF-8 text.
    pub fn read_str(&mut self) -> CodecResult<&'a str> {
        let offset = self.pos;
        let bytes = self.read_field()?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { offset })
    }

    /// Fail if any input remains.
    pub fn finish(&self) -> CodecResult<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(CodecError::TrailingInput { offset: self.pos })
        }
    }
}
