//! Field type resolution and syntax handling.

use crate::error::{Error, Result};
use prost_types::field_descriptor_proto::Type;
use prost_types::FieldDescriptorProto;

/// Proto syntax version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoSyntax {
    /// Proto2 syntax (also used when the descriptor leaves syntax empty)
    Proto2,
    /// Proto3 syntax
    Proto3,
    /// Anything else, rendered verbatim
    Other(String),
}

impl ProtoSyntax {
    /// Returns the syntax declaration string
    pub fn as_str(&self) -> &str {
        match self {
            ProtoSyntax::Proto2 => "proto2",
            ProtoSyntax::Proto3 => "proto3",
            ProtoSyntax::Other(s) => s,
        }
    }
}

impl From<&str> for ProtoSyntax {
    fn from(value: &str) -> Self {
        match value {
            "" | "proto2" => ProtoSyntax::Proto2,
            "proto3" => ProtoSyntax::Proto3,
            other => ProtoSyntax::Other(other.to_string()),
        }
    }
}

/// Returns the keyword for a scalar wire type code, or `None` for
/// message, enum, group and unknown codes.
pub fn scalar_keyword(code: i32) -> Option<&'static str> {
    let keyword = match Type::try_from(code).ok()? {
        Type::Double => "double",
        Type::Float => "float",
        Type::Int64 => "int64",
        Type::Uint64 => "uint64",
        Type::Int32 => "int32",
        Type::Fixed64 => "fixed64",
        Type::Fixed32 => "fixed32",
        Type::Bool => "bool",
        Type::String => "string",
        Type::Bytes => "bytes",
        Type::Uint32 => "uint32",
        Type::Sfixed32 => "sfixed32",
        Type::Sfixed64 => "sfixed64",
        Type::Sint32 => "sint32",
        Type::Sint64 => "sint64",
        Type::Group | Type::Message | Type::Enum => return None,
    };
    Some(keyword)
}

/// Last dot-separated segment of a (possibly fully-qualified) type reference.
pub fn last_segment(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

/// Resolves the display type of a field: a scalar keyword, or the last
/// segment of the referenced message/enum name.
pub fn field_type(field: &FieldDescriptorProto) -> Result<&str> {
    let Some(code) = field.r#type else {
        // Unresolved descriptors may omit the type but still carry a reference
        if field.type_name().is_empty() {
            return Err(Error::descriptor_build(format!(
                "field '{}' has neither a type nor a type name",
                field.name()
            )));
        }
        return Ok(last_segment(field.type_name()));
    };

    match Type::try_from(code) {
        Ok(Type::Message | Type::Enum) if field.type_name().is_empty() => {
            Err(Error::descriptor_build(format!(
                "field '{}' references a message or enum without a type name",
                field.name()
            )))
        }
        Ok(Type::Message | Type::Enum) => Ok(last_segment(field.type_name())),
        Ok(Type::Group) => Err(Error::unsupported("GROUP", field.name())),
        Ok(_) => scalar_keyword(code)
            .ok_or_else(|| Error::unsupported(format!("field type {code}"), field.name())),
        Err(_) => Err(Error::unsupported(format!("field type {code}"), field.name())),
    }
}
