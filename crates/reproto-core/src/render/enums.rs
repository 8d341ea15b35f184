use super::ProtoRenderer;
use crate::error::Result;
use prost_types::EnumDescriptorProto;
use std::collections::HashSet;
use std::fmt::Write as FmtWrite;
use tracing::warn;

impl<W: FmtWrite> ProtoRenderer<'_, W> {
    pub(super) fn write_enum(
        &mut self,
        enum_type: &EnumDescriptorProto,
        indent: &str,
    ) -> Result<()> {
        writeln!(self.out, "{indent}enum {} {{", enum_type.name())?;
        let inner = self.nested(indent);

        let allow_alias = enum_type
            .options
            .as_ref()
            .is_some_and(|o| o.allow_alias.unwrap_or(false));
        if allow_alias {
            writeln!(self.out, "{inner}option allow_alias = true;")?;
        } else if has_duplicate_numbers(enum_type) {
            // Rendered as declared; protoc will reject it without the option
            warn!(
                enum_name = enum_type.name(),
                "enum reuses value numbers without allow_alias"
            );
        }

        for value in &enum_type.value {
            writeln!(self.out, "{inner}{} = {};", value.name(), value.number())?;
        }

        writeln!(self.out, "{indent}}}")?;
        Ok(())
    }
}

fn has_duplicate_numbers(enum_type: &EnumDescriptorProto) -> bool {
    let mut seen = HashSet::new();
    enum_type.value.iter().any(|v| !seen.insert(v.number()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{render_proto, RenderConfig};
    use pretty_assertions::assert_eq;
    use prost_types::{EnumOptions, EnumValueDescriptorProto, FileDescriptorProto};

    fn value(name: &str, number: i32) -> EnumValueDescriptorProto {
        EnumValueDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            ..Default::default()
        }
    }

    fn render(enum_type: EnumDescriptorProto) -> String {
        let proto = FileDescriptorProto {
            name: Some("e.proto".to_string()),
            syntax: Some("proto3".to_string()),
            enum_type: vec![enum_type],
            ..Default::default()
        };
        render_proto(&proto, &RenderConfig::default()).unwrap()
    }

    #[test]
    fn test_enum_values_in_order() {
        let text = render(EnumDescriptorProto {
            name: Some("Level".to_string()),
            value: vec![value("LOW", 2), value("NONE", 0), value("HIGH", 9)],
            ..Default::default()
        });
        let expected = "\
syntax = \"proto3\";
enum Level {
  LOW = 2;
  NONE = 0;
  HIGH = 9;
}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_allow_alias() {
        let text = render(EnumDescriptorProto {
            name: Some("Mode".to_string()),
            value: vec![value("MODE_OFF", 0), value("MODE_DISABLED", 0)],
            options: Some(EnumOptions {
                allow_alias: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        });
        let expected = "\
syntax = \"proto3\";
enum Mode {
  option allow_alias = true;
  MODE_OFF = 0;
  MODE_DISABLED = 0;
}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_duplicates_without_alias_are_rendered() {
        let enum_type = EnumDescriptorProto {
            name: Some("Loose".to_string()),
            value: vec![value("A", 1), value("B", 1)],
            ..Default::default()
        };
        assert!(has_duplicate_numbers(&enum_type));

        let text = render(enum_type);
        assert!(!text.contains("allow_alias"));
        assert!(text.contains("  A = 1;\n  B = 1;\n"));
    }
}
