//! Dependency-ordered traversal of file descriptors.
//!
//! [`Walker`] visits every dependency of a file before the file itself
//! (post-order over the import graph) and emits each distinct file exactly
//! once, however many paths lead to it. The visited set is owned by the
//! walker, so separate walkers never share state.
//!
//! Import graphs are acyclic by construction of the schema format; a
//! cyclic graph recurses without bound.

use crate::emit::{DirectoryEmitter, Emitter};
use crate::error::Result;
use crate::render::{render_file, RenderConfig};
use prost::Message;
use prost_reflect::FileDescriptor;
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// A handle to one file descriptor and, transitively, its imports.
pub trait DescriptorSource: Sized {
    /// Declared file name, unique across one run
    fn file_name(&self) -> &str;

    /// The serialized `FileDescriptorProto`
    fn serialized(&self) -> Cow<'_, [u8]>;

    /// Handles for the imported files, in declaration order
    fn imports(&self) -> Result<Vec<Self>>;
}

impl DescriptorSource for FileDescriptor {
    fn file_name(&self) -> &str {
        self.name()
    }

    fn serialized(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.file_descriptor_proto().encode_to_vec())
    }

    fn imports(&self) -> Result<Vec<Self>> {
        Ok(self.dependencies().collect())
    }
}

/// Renders a descriptor graph into an [`Emitter`], dependencies first.
#[derive(Debug)]
pub struct Walker<E> {
    emitter: E,
    config: RenderConfig,
    processed: HashSet<String>,
    order: Vec<String>,
}

impl<E: Emitter> Walker<E> {
    /// Creates a walker with the default render configuration
    pub fn new(emitter: E) -> Self {
        Self {
            emitter,
            config: RenderConfig::default(),
            processed: HashSet::new(),
            order: Vec::new(),
        }
    }

    /// Replaces the render configuration
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Emits `root` after all of its transitive imports. Files already
    /// emitted by this walker are skipped.
    pub fn walk<S: DescriptorSource>(&mut self, root: &S) -> Result<()> {
        let name = root.file_name();
        if self.processed.contains(name) {
            trace!(file = name, "already processed");
            return Ok(());
        }

        for dependency in root.imports()? {
            self.walk(&dependency)?;
        }

        let rendered = render_file(&root.serialized(), &self.config)?;
        self.emitter.emit(&rendered)?;
        debug!(file = name, "emitted proto file");

        self.processed.insert(name.to_string());
        self.order.push(name.to_string());
        Ok(())
    }

    /// Walks several roots, sharing the visited set between them
    pub fn walk_all<'s, S, I>(&mut self, roots: I) -> Result<()>
    where
        S: DescriptorSource + 's,
        I: IntoIterator<Item = &'s S>,
    {
        for root in roots {
            self.walk(root)?;
        }
        Ok(())
    }

    /// True if `name` has been emitted
    pub fn is_processed(&self, name: &str) -> bool {
        self.processed.contains(name)
    }

    /// File names in the order they were emitted
    pub fn emitted(&self) -> &[String] {
        &self.order
    }

    /// The emitter
    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    /// Consumes the walker and returns the emitter
    pub fn into_emitter(self) -> E {
        self.emitter
    }
}

/// Writes `root` and everything it imports under `output_root`, returning
/// the written paths in emission order.
pub fn reverse_descriptor<S: DescriptorSource>(
    root: &S,
    output_root: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let mut walker = Walker::new(DirectoryEmitter::new(output_root.as_ref()));
    walker.walk(root)?;
    Ok(walker.into_emitter().written().to_vec())
}
