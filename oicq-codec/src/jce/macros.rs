//! The `jce_struct!` schema macro.
//!
//! Each struct schema is declared exactly once; the macro derives the
//! struct, its `Default`, and both directions of the codec from that single
//! table. The upstream C++ got the same effect by re-including a `*Def.h`
//! under different macro bindings.

/// Declare a JCE struct schema.
///
/// ```
/// use oicq_codec::jce_struct;
///
/// jce_struct! {
///     /// Example schema.
///     pub struct Probe("Probe") {
///         0 => id: i32 = 0,
///         1 => label: String,
///     }
/// }
/// ```
///
/// Fields are listed in ascending tag order, `tag => name: type`, with an
/// optional `= default` used when the tag is absent on the wire. A field
/// without a default is required: its absence fails deserialization with
/// `MissingField`.
#[macro_export]
macro_rules! jce_struct {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($alias:literal) {
            $( $tag:literal => $field:ident : $fty:ty $(= $default:expr)? ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name {
            $( pub $field: $fty, )+
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self {
                    $( $field: $crate::jce_struct!(@init $($default)?), )+
                }
            }
        }

        impl $crate::jce::JceStruct for $name {
            const NAME: &'static str = $alias;

            fn serialize(
                &self,
                w: &mut $crate::jce::JceWriter<'_, '_>,
            ) -> $crate::Result<()> {
                $( $crate::jce::JceField::write_field(&self.$field, $tag, w)?; )+
                Ok(())
            }

            fn deserialize(r: &mut $crate::jce::JceReader<'_>) -> $crate::Result<Self> {
                Ok(Self {
                    $(
                        $field: match $crate::jce::JceField::read_field($tag, r)? {
                            Some(value) => value,
                            None => $crate::jce_struct!(@absent $field $($default)?),
                        },
                    )+
                })
            }
        }

        impl $crate::jce::JceField for $name {
            fn write_field(
                &self,
                tag: u32,
                w: &mut $crate::jce::JceWriter<'_, '_>,
            ) -> $crate::Result<()> {
                $crate::jce::write_struct_field(self, tag, w)
            }

            fn read_field(
                tag: u32,
                r: &mut $crate::jce::JceReader<'_>,
            ) -> $crate::Result<Option<Self>> {
                $crate::jce::read_struct_field(tag, r)
            }

            fn type_name() -> String {
                $alias.to_string()
            }
        }
    };

    (@init $default:expr) => { $default };
    (@init) => { ::std::default::Default::default() };

    (@absent $field:ident $default:expr) => { $default };
    (@absent $field:ident) => {
        return Err($crate::Error::MissingField { name: stringify!($field) })
    };
}
