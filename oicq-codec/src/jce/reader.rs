//! The JCE input stream: head parsing, skip machinery, primitive bodies.

use crate::io::Reader;
use crate::{Error, Result};

use super::head::{HeadData, JceType};

/// Reads JCE fields out of a byte slice.
///
/// The typed entry points live on [`super::JceField`]; this type provides
/// the head/skip machinery they share. A failed read never leaves the
/// cursor in the middle of a field: peeks restore the position themselves
/// and committed reads only advance on success.
pub struct JceReader<'a> {
    r: Reader<'a>,
}

impl<'a> JceReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { r: Reader::new(buf) }
    }

    /// Wrap an existing cursor, inheriting its position.
    pub fn from_reader(r: Reader<'a>) -> Self {
        Self { r }
    }

    /// Hand the underlying cursor back (for mixed JCE/raw layouts).
    pub fn into_inner(self) -> Reader<'a> {
        self.r
    }

    pub fn position(&self) -> usize {
        self.r.position()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    /// Read a head and report how many octets it occupied (1 or 2).
    pub fn read_head(&mut self) -> Result<(HeadData, usize)> {
        let first = self.r.read_u8()?;
        let ty = JceType::from_raw(first & 0x0F)?;
        let tag = (first >> 4) as u32;
        if tag != 0x0F {
            return Ok((HeadData::new(tag, ty), 1));
        }
        let tag = self.r.read_u8()? as u32;
        Ok((HeadData::new(tag, ty), 2))
    }

    /// Read a head, then seek back so it stays unconsumed.
    pub fn peek_head(&mut self) -> Result<(HeadData, usize)> {
        let start = self.r.position();
        let result = self.read_head();
        self.r.seek(start).expect("seek back to a visited offset");
        result
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.r.skip(n)
    }

    /// Skip one whole field: head plus body.
    pub fn skip_field(&mut self) -> Result<()> {
        let (head, _) = self.read_head()?;
        self.skip_field_of(head.ty)
    }

    /// Skip the body of a field whose head was already consumed.
    pub fn skip_field_of(&mut self, ty: JceType) -> Result<()> {
        match ty {
            JceType::Byte => self.r.skip(1),
            JceType::Short => self.r.skip(2),
            JceType::Int | JceType::Float => self.r.skip(4),
            JceType::Long | JceType::Double => self.r.skip(8),
            JceType::String1 => {
                let len = self.r.read_u8()? as usize;
                self.r.skip(len)
            }
            JceType::String4 => {
                let len = self.read_string4_len()?;
                self.r.skip(len)
            }
            JceType::Map => {
                let count = self.read_count()?;
                for _ in 0..count * 2 {
                    self.skip_field()?;
                }
                Ok(())
            }
            JceType::List => {
                let count = self.read_count()?;
                for _ in 0..count {
                    self.skip_field()?;
                }
                Ok(())
            }
            JceType::StructBegin => self.skip_to_struct_end(),
            JceType::StructEnd | JceType::ZeroTag => Ok(()),
            JceType::SimpleList => {
                let (inner, _) = self.read_head()?;
                if inner.ty != JceType::Byte {
                    return Err(Error::TypeMismatch {
                        expected: JceType::Byte,
                        got: inner.ty,
                    });
                }
                let len = self.read_count()?;
                self.r.skip(len)
            }
        }
    }

    /// Consume fields until the enclosing struct's `StructEnd` head.
    pub fn skip_to_struct_end(&mut self) -> Result<()> {
        loop {
            let (head, _) = self.read_head()?;
            self.skip_field_of(head.ty)?;
            if head.ty == JceType::StructEnd {
                return Ok(());
            }
        }
    }

    /// Advance to the field with the given tag within the current struct.
    ///
    /// Returns `false` without consuming anything when the tag is absent:
    /// either a `StructEnd` comes first, the ascending wire order has
    /// already passed it, or the head is unreadable here. On `true` the
    /// matched head is still unconsumed.
    pub fn skip_to_tag(&mut self, tag: u32) -> Result<bool> {
        loop {
            let (head, head_size) = match self.peek_head() {
                Ok(v) => v,
                // No more bytes or a foreign type nibble: not a match.
                // Genuine corruption resurfaces on the next committed read.
                Err(Error::TruncatedInput) | Err(Error::UnknownType { .. }) => return Ok(false),
                Err(e) => return Err(e),
            };
            if head.ty == JceType::StructEnd {
                return Ok(false);
            }
            if head.tag == tag {
                return Ok(true);
            }
            if head.tag > tag {
                // Fields are written in ascending tag order.
                return Ok(false);
            }
            self.r.skip(head_size)?;
            self.skip_field_of(head.ty)?;
        }
    }

    // ─── primitive bodies ────────────────────────────────────────────────────

    /// Read an integer body for `head`, sign-extending narrow kinds.
    pub(super) fn read_int_body(&mut self, head: HeadData, widest: JceType) -> Result<i64> {
        let order = int_rank(head.ty);
        if order.is_none() || int_rank(widest) < order {
            return Err(Error::TypeMismatch { expected: widest, got: head.ty });
        }
        Ok(match head.ty {
            JceType::ZeroTag => 0,
            JceType::Byte => self.r.read_u8()? as i8 as i64,
            JceType::Short => self.r.read_i16_le()? as i64,
            JceType::Int => self.r.read_i32_le()? as i64,
            JceType::Long => self.r.read_i64_le()?,
            _ => unreachable!("rank check covers the integer kinds"),
        })
    }

    pub(super) fn read_float_body(&mut self, head: HeadData, widest: JceType) -> Result<f64> {
        match head.ty {
            JceType::ZeroTag => Ok(0.0),
            JceType::Float => Ok(self.r.read_f32_le()? as f64),
            JceType::Double if widest == JceType::Double => Ok(self.r.read_f64_le()?),
            _ => Err(Error::TypeMismatch { expected: widest, got: head.ty }),
        }
    }

    pub(super) fn read_string_body(&mut self, head: HeadData) -> Result<String> {
        let len = match head.ty {
            JceType::String1 => self.r.read_u8()? as usize,
            JceType::String4 => self.read_string4_len()?,
            _ => {
                return Err(Error::TypeMismatch {
                    expected: JceType::String1,
                    got: head.ty,
                });
            }
        };
        let bytes = self.r.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidUtf8)
    }

    /// Read a count encoded as an integer field at tag 0.
    pub(super) fn read_count(&mut self) -> Result<usize> {
        let (head, _) = self.read_head()?;
        let count = self.read_int_body(head, JceType::Int)?;
        if count < 0 {
            return Err(Error::InvalidSize { size: count });
        }
        Ok(count as usize)
    }

    pub(super) fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        self.r.read_bytes(len)
    }

    fn read_string4_len(&mut self) -> Result<usize> {
        let len = self.r.read_u32_be()? as usize;
        if len > super::head::MAX_STRING_LEN {
            return Err(Error::InvalidSize { size: len as i64 });
        }
        Ok(len)
    }
}

/// Widening order of the integer kinds; `None` for non-integers.
fn int_rank(ty: JceType) -> Option<u8> {
    Some(match ty {
        JceType::ZeroTag => 0,
        JceType::Byte => 1,
        JceType::Short => 2,
        JceType::Int => 3,
        JceType::Long => 4,
        _ => return None,
    })
}
