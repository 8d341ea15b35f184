use super::types::last_segment;
use super::ProtoRenderer;
use crate::error::Result;
use prost_types::{MethodDescriptorProto, ServiceDescriptorProto};
use std::fmt::Write as FmtWrite;

impl<W: FmtWrite> ProtoRenderer<'_, W> {
    pub(super) fn write_service(&mut self, service: &ServiceDescriptorProto) -> Result<()> {
        writeln!(self.out, "service {} {{", service.name())?;
        let inner = self.nested("");

        for method in &service.method {
            self.write_method(method, &inner)?;
        }

        writeln!(self.out, "}}")?;
        Ok(())
    }

    fn write_method(&mut self, method: &MethodDescriptorProto, indent: &str) -> Result<()> {
        let stream = |on: bool| if on { "stream " } else { "" };

        writeln!(
            self.out,
            "{indent}rpc {} ({}{}) returns ({}{});",
            method.name(),
            stream(method.client_streaming()),
            last_segment(method.input_type()),
            stream(method.server_streaming()),
            last_segment(method.output_type()),
        )?;
        Ok(())
    }
}
