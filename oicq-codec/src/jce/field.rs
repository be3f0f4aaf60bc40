//! The [`JceField`] trait: typed reads and writes for every field kind.
//!
//! The C-side of Taf dispatches on overloads; here each Rust type that can
//! appear as a struct field carries its own wire rules. Reads return
//! `Ok(None)` when the tag is absent so struct deserializers can fall back
//! to declared defaults.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

use crate::{Error, Result};

use super::head::JceType;
use super::reader::JceReader;
use super::writer::JceWriter;

/// A value that can be written to and read from a tagged JCE field.
pub trait JceField: Sized {
    /// Append `self` as the field with the given tag.
    fn write_field(&self, tag: u32, w: &mut JceWriter<'_, '_>) -> Result<()>;

    /// Read the field with the given tag, or `None` if it is absent
    /// from the current struct extent.
    fn read_field(tag: u32, r: &mut JceReader<'_>) -> Result<Option<Self>>;

    /// The Wup attribute type name for this field kind.
    fn type_name() -> String;
}

/// Read a field that must exist (container internals), mapping absence
/// to a named [`Error::MissingField`].
fn read_required<T: JceField>(
    tag: u32,
    r: &mut JceReader<'_>,
    name: &'static str,
) -> Result<T> {
    T::read_field(tag, r)?.ok_or(Error::MissingField { name })
}

// ─── integers ────────────────────────────────────────────────────────────────

macro_rules! int_field {
    ($ty:ty, $widest:expr, $name:literal) => {
        impl JceField for $ty {
            fn write_field(&self, tag: u32, w: &mut JceWriter<'_, '_>) -> Result<()> {
                w.write_int(tag, *self as i64, $widest)
            }

            fn read_field(tag: u32, r: &mut JceReader<'_>) -> Result<Option<Self>> {
                if !r.skip_to_tag(tag)? {
                    return Ok(None);
                }
                let (head, _) = r.read_head()?;
                Ok(Some(r.read_int_body(head, $widest)? as $ty))
            }

            fn type_name() -> String {
                $name.to_string()
            }
        }
    };
}

int_field!(u8, JceType::Byte, "char");
int_field!(i16, JceType::Short, "short");
int_field!(i32, JceType::Int, "int32");
int_field!(i64, JceType::Long, "int64");

// ─── floats ──────────────────────────────────────────────────────────────────

impl JceField for f32 {
    fn write_field(&self, tag: u32, w: &mut JceWriter<'_, '_>) -> Result<()> {
        w.write_f32(tag, *self)
    }

    fn read_field(tag: u32, r: &mut JceReader<'_>) -> Result<Option<Self>> {
        if !r.skip_to_tag(tag)? {
            return Ok(None);
        }
        let (head, _) = r.read_head()?;
        Ok(Some(r.read_float_body(head, JceType::Float)? as f32))
    }

    fn type_name() -> String {
        "float".to_string()
    }
}

impl JceField for f64 {
    fn write_field(&self, tag: u32, w: &mut JceWriter<'_, '_>) -> Result<()> {
        w.write_f64(tag, *self)
    }

    fn read_field(tag: u32, r: &mut JceReader<'_>) -> Result<Option<Self>> {
        if !r.skip_to_tag(tag)? {
            return Ok(None);
        }
        let (head, _) = r.read_head()?;
        Ok(Some(r.read_float_body(head, JceType::Double)?))
    }

    fn type_name() -> String {
        "double".to_string()
    }
}

// ─── strings ─────────────────────────────────────────────────────────────────

impl JceField for String {
    fn write_field(&self, tag: u32, w: &mut JceWriter<'_, '_>) -> Result<()> {
        w.write_str(tag, self)
    }

    fn read_field(tag: u32, r: &mut JceReader<'_>) -> Result<Option<Self>> {
        if !r.skip_to_tag(tag)? {
            return Ok(None);
        }
        let (head, _) = r.read_head()?;
        Ok(Some(r.read_string_body(head)?))
    }

    fn type_name() -> String {
        "string".to_string()
    }
}

// ─── byte arrays ─────────────────────────────────────────────────────────────

/// An owned byte array encoded with the `SimpleList` shortcut.
///
/// Distinct from `Vec<u8>` so the generic list impl stays unambiguous,
/// the same way a bare vector gets its own wrapper in TL codecs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Bytes {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for Bytes {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<&[u8]> for Bytes {
    fn from(v: &[u8]) -> Self {
        Self(v.to_vec())
    }
}

impl JceField for Bytes {
    fn write_field(&self, tag: u32, w: &mut JceWriter<'_, '_>) -> Result<()> {
        w.write_simple_list(tag, &self.0)
    }

    fn read_field(tag: u32, r: &mut JceReader<'_>) -> Result<Option<Self>> {
        if !r.skip_to_tag(tag)? {
            return Ok(None);
        }
        let (head, _) = r.read_head()?;
        match head.ty {
            JceType::SimpleList => {
                let (inner, _) = r.read_head()?;
                if inner.ty != JceType::Byte {
                    return Err(Error::TypeMismatch {
                        expected: JceType::Byte,
                        got: inner.ty,
                    });
                }
                let len = r.read_count()?;
                Ok(Some(Self(r.read_raw(len)?.to_vec())))
            }
            // Writers that never learned the shortcut emit a plain list.
            JceType::List => {
                let count = r.read_count()?;
                let mut out = Vec::with_capacity(count);
                for _ in 0..count {
                    out.push(read_required::<u8>(0, r, "list element")?);
                }
                Ok(Some(Self(out)))
            }
            _ => Err(Error::TypeMismatch {
                expected: JceType::SimpleList,
                got: head.ty,
            }),
        }
    }

    fn type_name() -> String {
        "list<char>".to_string()
    }
}

// ─── containers ──────────────────────────────────────────────────────────────

impl<T: JceField> JceField for Vec<T> {
    fn write_field(&self, tag: u32, w: &mut JceWriter<'_, '_>) -> Result<()> {
        w.open(tag, JceType::List)?;
        w.write_count(self.len())?;
        for item in self {
            item.write_field(0, w)?;
        }
        Ok(())
    }

    fn read_field(tag: u32, r: &mut JceReader<'_>) -> Result<Option<Self>> {
        if !r.skip_to_tag(tag)? {
            return Ok(None);
        }
        let (head, _) = r.read_head()?;
        if head.ty != JceType::List {
            return Err(Error::TypeMismatch { expected: JceType::List, got: head.ty });
        }
        let count = r.read_count()?;
        let mut out = Vec::with_capacity(count.min(0x10000));
        for _ in 0..count {
            out.push(read_required::<T>(0, r, "list element")?);
        }
        Ok(Some(out))
    }

    fn type_name() -> String {
        format!("list<{}>", T::type_name())
    }
}

impl<K, V> JceField for HashMap<K, V>
where
    K: JceField + Eq + Hash,
    V: JceField,
{
    fn write_field(&self, tag: u32, w: &mut JceWriter<'_, '_>) -> Result<()> {
        w.open(tag, JceType::Map)?;
        w.write_count(self.len())?;
        for (key, value) in self {
            key.write_field(0, w)?;
            value.write_field(1, w)?;
        }
        Ok(())
    }

    fn read_field(tag: u32, r: &mut JceReader<'_>) -> Result<Option<Self>> {
        if !r.skip_to_tag(tag)? {
            return Ok(None);
        }
        let (head, _) = r.read_head()?;
        if head.ty != JceType::Map {
            return Err(Error::TypeMismatch { expected: JceType::Map, got: head.ty });
        }
        let count = r.read_count()?;
        let mut out = HashMap::with_capacity(count.min(0x10000));
        for _ in 0..count {
            let key = read_required::<K>(0, r, "map key")?;
            let value = read_required::<V>(1, r, "map value")?;
            out.insert(key, value);
        }
        Ok(Some(out))
    }

    fn type_name() -> String {
        format!("map<{},{}>", K::type_name(), V::type_name())
    }
}
