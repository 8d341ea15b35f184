//! `.proto` source rendering.
//!
//! This module turns one serialized `FileDescriptorProto` into schema text.
//!
//! ## Layout
//!
//! A rendered file is emitted in this order:
//!
//! 1. `syntax` declaration and optional `package`
//! 2. imports, rewritten relative to the importing file
//! 3. file options
//! 4. services, then top-level enums, then top-level messages
//!
//! Nested declarations are rendered recursively with the indentation prefix
//! threaded through every call. Synthetic map-entry messages are never
//! declared; fields referencing them collapse into `map<K,V>` shorthand.

mod enums;
mod message;
mod service;
mod types;

use crate::error::Result;
use crate::imports;
use prost::Message;
use prost_types::FileDescriptorProto;
use std::fmt::Write as FmtWrite;
use tracing::trace;

pub use types::{field_type, last_segment, scalar_keyword, ProtoSyntax};

/// Configuration for rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Indentation added per nesting level (default: 2 spaces)
    pub indent: String,
    /// Dependency prefixes that are never emitted as imports
    pub well_known_prefixes: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            well_known_prefixes: vec!["google/".to_string()],
        }
    }
}

impl RenderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent(mut self, s: impl Into<String>) -> Self {
        self.indent = s.into();
        self
    }

    /// Replaces the well-known dependency prefixes
    pub fn well_known_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.well_known_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if `dependency` belongs to a well-known namespace
    pub fn is_well_known(&self, dependency: &str) -> bool {
        self.well_known_prefixes
            .iter()
            .any(|prefix| dependency.starts_with(prefix.as_str()))
    }
}

/// One rendered `.proto` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Descriptor file name, also the path relative to the output root
    pub name: String,
    /// The rendered schema text
    pub text: String,
}

/// Deserializes one file descriptor and renders it.
pub fn render_file(data: &[u8], config: &RenderConfig) -> Result<RenderedFile> {
    let proto = FileDescriptorProto::decode(data)?;
    trace!(descriptor = ?proto, "decoded file descriptor");

    let text = render_proto(&proto, config)?;
    Ok(RenderedFile {
        name: proto.name().to_string(),
        text,
    })
}

/// Renders an already decoded file descriptor.
pub fn render_proto(proto: &FileDescriptorProto, config: &RenderConfig) -> Result<String> {
    let mut output = String::new();
    let mut renderer = ProtoRenderer::new(&mut output, config, ProtoSyntax::from(proto.syntax()));
    renderer.write_file(proto)?;
    Ok(output)
}

/// Writes schema text for one file into any `fmt::Write` sink
struct ProtoRenderer<'a, W: FmtWrite> {
    out: &'a mut W,
    config: &'a RenderConfig,
    syntax: ProtoSyntax,
}

impl<'a, W: FmtWrite> ProtoRenderer<'a, W> {
    fn new(out: &'a mut W, config: &'a RenderConfig, syntax: ProtoSyntax) -> Self {
        Self {
            out,
            config,
            syntax,
        }
    }

    /// Indentation prefix one level below `indent`
    fn nested(&self, indent: &str) -> String {
        format!("{indent}{}", self.config.indent)
    }

    fn write_file(&mut self, proto: &FileDescriptorProto) -> Result<()> {
        writeln!(self.out, "syntax = \"{}\";", self.syntax.as_str())?;

        if !proto.package().is_empty() {
            writeln!(self.out, "package {};", proto.package())?;
        }

        self.write_imports(proto)?;
        self.write_file_options(proto)?;

        for service in &proto.service {
            self.write_service(service)?;
        }

        for enum_type in &proto.enum_type {
            self.write_enum(enum_type, "")?;
        }

        for message in &proto.message_type {
            self.write_message(message, "")?;
        }

        Ok(())
    }

    fn write_imports(&mut self, proto: &FileDescriptorProto) -> Result<()> {
        for (i, dep) in proto.dependency.iter().enumerate() {
            if self.config.is_well_known(dep) {
                continue;
            }

            let index = i as i32;
            let modifier = if proto.public_dependency.contains(&index) {
                "public "
            } else if proto.weak_dependency.contains(&index) {
                "weak "
            } else {
                ""
            };

            let path = imports::relative_import(proto.name(), dep);
            writeln!(self.out, "import {modifier}\"{path}\";")?;
        }
        Ok(())
    }

    fn write_file_options(&mut self, proto: &FileDescriptorProto) -> Result<()> {
        let Some(opts) = &proto.options else {
            return Ok(());
        };

        let strings = [
            ("java_package", &opts.java_package),
            ("java_outer_classname", &opts.java_outer_classname),
            ("go_package", &opts.go_package),
            ("objc_class_prefix", &opts.objc_class_prefix),
            ("csharp_namespace", &opts.csharp_namespace),
            ("swift_prefix", &opts.swift_prefix),
            ("php_namespace", &opts.php_namespace),
            ("ruby_package", &opts.ruby_package),
        ];
        for (name, value) in strings {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                writeln!(self.out, "option {name} = \"{}\";", escape_string(v))?;
            }
        }

        let bools = [
            ("java_multiple_files", opts.java_multiple_files),
            ("cc_enable_arenas", opts.cc_enable_arenas),
        ];
        for (name, value) in bools {
            if let Some(v) = value {
                writeln!(self.out, "option {name} = {v};")?;
            }
        }

        Ok(())
    }
}

/// Escape a string for proto syntax
fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ if c.is_ascii_control() => {
                let _ = write!(result, "\\x{:02x}", c as u8);
            }
            _ => result.push(c),
        }
    }
    result
}
