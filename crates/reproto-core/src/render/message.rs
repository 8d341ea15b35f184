//! Message and field rendering.

use super::types::{field_type, ProtoSyntax};
use super::ProtoRenderer;
use crate::error::{Error, Result};
use prost_types::field_descriptor_proto::Label;
use prost_types::{DescriptorProto, FieldDescriptorProto};
use std::collections::HashMap;
use std::fmt::Write as FmtWrite;

/// Map shorthands registered for one message, keyed by the local name of
/// the synthetic map-entry type.
type MapEntries<'m> = HashMap<&'m str, String>;

impl<W: FmtWrite> ProtoRenderer<'_, W> {
    pub(super) fn write_message(&mut self, message: &DescriptorProto, indent: &str) -> Result<()> {
        writeln!(self.out, "{indent}message {}", message.name())?;
        writeln!(self.out, "{indent}{{")?;

        let inner = self.nested(indent);

        let mut maps = MapEntries::new();
        for nested in &message.nested_type {
            if is_map_entry(nested) {
                maps.insert(nested.name(), map_shorthand(nested)?);
            } else {
                self.write_message(nested, &inner)?;
            }
        }

        for enum_type in &message.enum_type {
            self.write_enum(enum_type, &inner)?;
        }

        let mut written_oneofs = Vec::new();
        for field in &message.field {
            match real_oneof(field) {
                Some(index) => {
                    // A oneof is written once, where its first member appears
                    if written_oneofs.contains(&index) {
                        continue;
                    }
                    written_oneofs.push(index);
                    self.write_oneof(message, index, &maps, &inner)?;
                }
                None => self.write_field(field, &maps, &inner, true)?,
            }
        }

        writeln!(self.out, "{indent}}}")?;
        Ok(())
    }

    fn write_oneof(
        &mut self,
        message: &DescriptorProto,
        index: i32,
        maps: &MapEntries<'_>,
        indent: &str,
    ) -> Result<()> {
        let name = message
            .oneof_decl
            .get(index as usize)
            .map(|oneof| oneof.name())
            .ok_or_else(|| {
                Error::descriptor_build(format!(
                    "message '{}' references missing oneof #{index}",
                    message.name()
                ))
            })?;

        writeln!(self.out, "{indent}oneof {name} {{")?;
        let inner = self.nested(indent);
        for field in message
            .field
            .iter()
            .filter(|f| real_oneof(f) == Some(index))
        {
            self.write_field(field, maps, &inner, false)?;
        }
        writeln!(self.out, "{indent}}}")?;
        Ok(())
    }

    fn write_field(
        &mut self,
        field: &FieldDescriptorProto,
        maps: &MapEntries<'_>,
        indent: &str,
        labelled: bool,
    ) -> Result<()> {
        let resolved = field_type(field)?;
        let (type_str, is_map) = match maps.get(resolved) {
            Some(shorthand) => (shorthand.as_str(), true),
            None => (resolved, false),
        };

        let label = if labelled && !is_map {
            self.field_label(field)
        } else {
            ""
        };

        write!(
            self.out,
            "{indent}{label}{type_str} {} = {}",
            field.name(),
            field.number()
        )?;

        let options = field_options(field);
        if !options.is_empty() {
            write!(self.out, " [{}]", options.join(", "))?;
        }

        writeln!(self.out, ";")?;
        Ok(())
    }

    fn field_label(&self, field: &FieldDescriptorProto) -> &'static str {
        match field.label() {
            Label::Repeated => "repeated ",
            Label::Required => "required ",
            Label::Optional => match self.syntax {
                ProtoSyntax::Proto2 => "optional ",
                _ if field.proto3_optional() => "optional ",
                _ => "",
            },
        }
    }
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    message
        .options
        .as_ref()
        .is_some_and(|o| o.map_entry.unwrap_or(false))
}

/// Builds `map<K,V>` from a synthetic entry's key (1) and value (2) fields.
fn map_shorthand(entry: &DescriptorProto) -> Result<String> {
    let by_number = |number| entry.field.iter().find(|f| f.number() == number);
    let (Some(key), Some(value)) = (by_number(1), by_number(2)) else {
        return Err(Error::descriptor_build(format!(
            "map entry '{}' lacks a key or value field",
            entry.name()
        )));
    };
    Ok(format!("map<{},{}>", field_type(key)?, field_type(value)?))
}

/// Oneof index of a field that belongs to a declared oneof. Proto3
/// `optional` fields sit in synthetic oneofs and are treated as plain fields.
fn real_oneof(field: &FieldDescriptorProto) -> Option<i32> {
    field.oneof_index.filter(|_| !field.proto3_optional())
}

fn field_options(field: &FieldDescriptorProto) -> Vec<String> {
    let mut options = Vec::new();
    if let Some(opts) = &field.options {
        if opts.packed == Some(true) {
            options.push("packed = true".to_string());
        }
        if opts.deprecated == Some(true) {
            options.push("deprecated = true".to_string());
        }
    }
    options
}
