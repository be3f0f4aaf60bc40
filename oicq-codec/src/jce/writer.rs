//! The JCE output stream: head encoding and primitive bodies.

use crate::io::Writer;
use crate::{Error, Result};

use super::head::{HeadData, JceType, MAX_STRING_LEN};

/// Writes JCE fields into a byte sink.
///
/// Integer entry points narrow to the smallest kind that holds the value,
/// down to a bare `ZeroTag` head for zero; the matching readers widen.
pub struct JceWriter<'w, 'b> {
    w: &'w mut Writer<'b>,
}

impl<'w, 'b> JceWriter<'w, 'b> {
    pub fn new(w: &'w mut Writer<'b>) -> Self {
        Self { w }
    }

    pub fn write_head(&mut self, head: HeadData) -> Result<()> {
        if head.tag > 0xFF {
            return Err(Error::TagTooLarge { tag: head.tag });
        }
        if head.tag < 0x0F {
            self.w.write_u8(((head.tag as u8) << 4) | head.ty as u8)
        } else {
            self.w.write_u8(0xF0 | head.ty as u8)?;
            self.w.write_u8(head.tag as u8)
        }
    }

    /// Write an integer field, narrowed; `widest` caps the kind chosen.
    pub fn write_int(&mut self, tag: u32, value: i64, widest: JceType) -> Result<()> {
        debug_assert!(matches!(
            widest,
            JceType::Byte | JceType::Short | JceType::Int | JceType::Long
        ));
        if value == 0 {
            return self.write_head(HeadData::new(tag, JceType::ZeroTag));
        }
        if i8::try_from(value).is_ok() || widest == JceType::Byte {
            self.write_head(HeadData::new(tag, JceType::Byte))?;
            return self.w.write_u8(value as u8);
        }
        if i16::try_from(value).is_ok() || widest == JceType::Short {
            self.write_head(HeadData::new(tag, JceType::Short))?;
            return self.w.write_i16_le(value as i16);
        }
        if i32::try_from(value).is_ok() || widest == JceType::Int {
            self.write_head(HeadData::new(tag, JceType::Int))?;
            return self.w.write_i32_le(value as i32);
        }
        self.write_head(HeadData::new(tag, JceType::Long))?;
        self.w.write_i64_le(value)
    }

    pub fn write_f32(&mut self, tag: u32, value: f32) -> Result<()> {
        self.write_head(HeadData::new(tag, JceType::Float))?;
        self.w.write_f32_le(value)
    }

    pub fn write_f64(&mut self, tag: u32, value: f64) -> Result<()> {
        self.write_head(HeadData::new(tag, JceType::Double))?;
        self.w.write_f64_le(value)
    }

    /// Write a string field, choosing `String1` or `String4` by length.
    pub fn write_str(&mut self, tag: u32, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(Error::StringTooLong { len: bytes.len() });
        }
        if bytes.len() <= 0xFF {
            self.write_head(HeadData::new(tag, JceType::String1))?;
            self.w.write_u8(bytes.len() as u8)?;
        } else {
            self.write_head(HeadData::new(tag, JceType::String4))?;
            self.w.write_u32_be(bytes.len() as u32)?;
        }
        self.w.write_bytes(bytes)
    }

    /// Write a byte array with the `SimpleList` shortcut.
    pub fn write_simple_list(&mut self, tag: u32, value: &[u8]) -> Result<()> {
        self.write_head(HeadData::new(tag, JceType::SimpleList))?;
        self.write_head(HeadData::new(0, JceType::Byte))?;
        self.write_int(0, value.len() as i64, JceType::Int)?;
        self.w.write_bytes(value)
    }

    /// Write the head of a container; the caller emits count and entries.
    pub(super) fn open(&mut self, tag: u32, ty: JceType) -> Result<()> {
        self.write_head(HeadData::new(tag, ty))
    }

    pub(super) fn write_count(&mut self, count: usize) -> Result<()> {
        self.write_int(0, count as i64, JceType::Int)
    }

    pub fn struct_begin(&mut self, tag: u32) -> Result<()> {
        self.write_head(HeadData::new(tag, JceType::StructBegin))
    }

    pub fn struct_end(&mut self) -> Result<()> {
        self.write_head(HeadData::new(0, JceType::StructEnd))
    }
}
