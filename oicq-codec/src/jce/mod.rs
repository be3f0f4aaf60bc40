//! The JCE codec: an IDL-like tag-length-value serialization inherited
//! from the Taf RPC stack.
//!
//! Every field on the wire is a [`HeadData`] (tag + type nibble) followed
//! by a type-specific body. Struct schemas are declared once with
//! [`crate::jce_struct!`]; readers match fields by tag, tolerate elided
//! optionals and skip unknown trailing tags.

mod field;
mod head;
mod macros;
mod reader;
mod writer;

pub use field::{Bytes, JceField};
pub use head::{HeadData, JceType, MAX_STRING_LEN};
pub use reader::JceReader;
pub use writer::JceWriter;

use crate::{Error, Result};

/// A named struct schema, (de)serializable field-by-field.
///
/// Implemented by the `jce_struct!` macro; `serialize` and `deserialize`
/// handle the fields only, while the bracketing `StructBegin`/`StructEnd`
/// heads belong to the enclosing field (see [`write_struct_field`]).
pub trait JceStruct: Sized {
    /// The schema name, doubling as the Wup attribute alias.
    const NAME: &'static str;

    fn serialize(&self, w: &mut JceWriter<'_, '_>) -> Result<()>;

    fn deserialize(r: &mut JceReader<'_>) -> Result<Self>;
}

/// Write a struct as a tagged field, bracketed by struct heads.
pub fn write_struct_field<T: JceStruct>(
    value: &T,
    tag: u32,
    w: &mut JceWriter<'_, '_>,
) -> Result<()> {
    w.struct_begin(tag)?;
    value.serialize(w)?;
    w.struct_end()
}

/// Read a struct field by tag; unknown trailing fields inside the struct
/// extent are consumed up to its `StructEnd`.
pub fn read_struct_field<T: JceStruct>(
    tag: u32,
    r: &mut JceReader<'_>,
) -> Result<Option<T>> {
    if !r.skip_to_tag(tag)? {
        return Ok(None);
    }
    let (head, _) = r.read_head()?;
    if head.ty != JceType::StructBegin {
        return Err(Error::TypeMismatch { expected: JceType::StructBegin, got: head.ty });
    }
    let value = T::deserialize(r)?;
    r.skip_to_struct_end()?;
    Ok(Some(value))
}
