//! Parameter schemas tied to their params types.
//!
//! Every params struct carries its own schema through [`Params`]. When a
//! service registers, each schema is checked against the struct serde
//! actually derives: the names must match the struct's fields, and a
//! parameter declared optional must be one the struct can do without.

use serde::de::value::{Error as ValueError, MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

use crate::error::RpcError;
use crate::service::Param;

/// A params struct and the ordered schema callers bind against.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct RoundParams {
///     value: f64,
///     #[serde(default)]
///     digits: Option<i32>,
/// }
///
/// impl Params for RoundParams {
///     const SCHEMA: &'static [Param] = &[Param::required("value"), Param::optional("digits")];
/// }
/// ```
pub trait Params: DeserializeOwned {
    const SCHEMA: &'static [Param];
}

/// Check `P::SCHEMA` against the shape of `P`.
pub(crate) fn check_schema<P: Params>(operation: &'static str) -> Result<(), RpcError> {
    let schema = P::SCHEMA;

    if let Some(fields) = struct_fields::<P>() {
        if let Some(param) = schema.iter().find(|p| !fields.contains(&p.name)) {
            return Err(RpcError::invalid_argument(format!(
                "operation {}: parameter {} is not a field of its params type",
                operation, param.name
            )));
        }
        if let Some(field) = fields.iter().find(|f| !schema.iter().any(|p| p.name == **f)) {
            return Err(RpcError::invalid_argument(format!(
                "operation {}: field {} is missing from the parameter schema",
                operation, field
            )));
        }
    }

    // Supply only the required parameters. If serde then complains about a
    // parameter the schema calls optional, the two disagree.
    let required = schema
        .iter()
        .filter(|p| p.required)
        .map(|p| (p.name, Placeholder));
    if let Err(err) = P::deserialize(MapDeserializer::<_, ValueError>::new(required)) {
        let message = err.to_string();
        if let Some(param) = schema
            .iter()
            .find(|p| !p.required && message == format!("missing field `{}`", p.name))
        {
            return Err(RpcError::invalid_argument(format!(
                "operation {}: parameter {} is declared optional but its field is required",
                operation, param.name
            )));
        }
    }
    Ok(())
}

/// Field names of `P` when it deserializes as a plain struct.
fn struct_fields<P: DeserializeOwned>() -> Option<&'static [&'static str]> {
    let mut fields = None;
    let _ = P::deserialize(FieldNames {
        fields: &mut fields,
    });
    fields
}

/// Records the field list serde hands to `deserialize_struct`, then stops.
struct FieldNames<'a> {
    fields: &'a mut Option<&'static [&'static str]>,
}

impl<'de> Deserializer<'de> for FieldNames<'_> {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("params type is not a struct"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        *self.fields = Some(fields);
        Err(de::Error::custom("fields recorded"))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

/// Stand-in value that deserializes as the zero value of whatever is asked.
#[derive(Clone, Copy)]
struct Placeholder;

impl<'de> IntoDeserializer<'de, ValueError> for Placeholder {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! placeholder_scalars {
    ($($method:ident => $visit:ident($value:expr),)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                visitor.$visit($value)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Placeholder {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    placeholder_scalars! {
        deserialize_bool => visit_bool(false),
        deserialize_i8 => visit_i64(0),
        deserialize_i16 => visit_i64(0),
        deserialize_i32 => visit_i64(0),
        deserialize_i64 => visit_i64(0),
        deserialize_i128 => visit_i64(0),
        deserialize_u8 => visit_u64(0),
        deserialize_u16 => visit_u64(0),
        deserialize_u32 => visit_u64(0),
        deserialize_u64 => visit_u64(0),
        deserialize_u128 => visit_u64(0),
        deserialize_f32 => visit_f64(0.0),
        deserialize_f64 => visit_f64(0.0),
        deserialize_char => visit_char('0'),
        deserialize_str => visit_str(""),
        deserialize_string => visit_str(""),
        deserialize_bytes => visit_bytes(&[]),
        deserialize_byte_buf => visit_bytes(&[]),
        deserialize_identifier => visit_str(""),
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_none()
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(SeqDeserializer::<_, ValueError>::new(
            std::iter::empty::<Placeholder>(),
        ))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_map(MapDeserializer::<_, ValueError>::new(std::iter::empty::<(
            Placeholder,
            Placeholder,
        )>()))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("no placeholder for enums"))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}
