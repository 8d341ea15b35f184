//! Destinations for rendered files.
//!
//! The [`Emitter`] trait receives each [`RenderedFile`] once, in dependency
//! order. [`DirectoryEmitter`] materializes the output tree on disk and
//! [`MemoryEmitter`] keeps everything in memory.

use crate::error::{Error, Result};
use crate::imports;
use crate::render::RenderedFile;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Default output root for generated `.proto` files
pub const DEFAULT_OUTPUT_ROOT: &str = "protobuf";

/// Receives fully rendered files.
///
/// Files are only handed over once rendering succeeded, so an
/// implementation never sees partial output.
pub trait Emitter {
    /// Accept one rendered file
    fn emit(&mut self, file: &RenderedFile) -> Result<()>;
}

impl<E: Emitter + ?Sized> Emitter for &mut E {
    fn emit(&mut self, file: &RenderedFile) -> Result<()> {
        (**self).emit(file)
    }
}

/// Writes files under an output root, mirroring each descriptor name.
#[derive(Debug, Clone)]
pub struct DirectoryEmitter {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl Default for DirectoryEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_ROOT)
    }
}

impl DirectoryEmitter {
    /// Creates an emitter rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    /// The output root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths written so far, in emission order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Destination path for a descriptor name
    pub fn target_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(imports::output_path(name)?))
    }
}

impl Emitter for DirectoryEmitter {
    fn emit(&mut self, file: &RenderedFile) -> Result<()> {
        let target = self.target_path(&file.name)?;
        let parent = target.parent().unwrap_or(self.root.as_path());

        fs::create_dir_all(parent).map_err(|e| Error::directory_create(parent, e))?;

        // Replace the destination in one step so readers never see a partial file
        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| Error::file_write(&target, e))?;
        tmp.write_all(file.text.as_bytes())
            .map_err(|e| Error::file_write(&target, e))?;
        tmp.persist(&target)
            .map_err(|e| Error::file_write(&target, e.error))?;

        debug!(path = %target.display(), "wrote proto file");
        self.written.push(target);
        Ok(())
    }
}

/// Collects rendered files in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryEmitter {
    files: Vec<RenderedFile>,
}

impl MemoryEmitter {
    /// Creates an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Files collected so far, in emission order
    pub fn files(&self) -> &[RenderedFile] {
        &self.files
    }

    /// Looks up a collected file by descriptor name
    pub fn get(&self, name: &str) -> Option<&RenderedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Consumes the collector and returns the files
    pub fn into_files(self) -> Vec<RenderedFile> {
        self.files
    }
}

impl Emitter for MemoryEmitter {
    fn emit(&mut self, file: &RenderedFile) -> Result<()> {
        self.files.push(file.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rendered(name: &str, text: &str) -> RenderedFile {
        RenderedFile {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_directory_emitter_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let mut emitter = DirectoryEmitter::new(temp_dir.path().join("protobuf"));

        emitter
            .emit(&rendered("a/b/x.proto", "syntax = \"proto3\";\n"))
            .unwrap();
        // Existing directories are fine
        emitter
            .emit(&rendered("a/b/y.proto", "syntax = \"proto2\";\n"))
            .unwrap();

        let x = temp_dir.path().join("protobuf/a/b/x.proto");
        assert_eq!(fs::read_to_string(&x).unwrap(), "syntax = \"proto3\";\n");
        assert_eq!(emitter.written().len(), 2);
        assert_eq!(emitter.written()[0], x);
    }

    #[test]
    fn test_directory_emitter_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let mut emitter = DirectoryEmitter::new(temp_dir.path());

        emitter.emit(&rendered("x.proto", "old")).unwrap();
        emitter.emit(&rendered("x.proto", "new")).unwrap();

        let text = fs::read_to_string(temp_dir.path().join("x.proto")).unwrap();
        assert_eq!(text, "new");
    }

    #[test]
    fn test_directory_emitter_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let mut emitter = DirectoryEmitter::new(temp_dir.path().join("out"));

        let err = emitter
            .emit(&rendered("../escape.proto", "x"))
            .unwrap_err();
        assert!(matches!(err, Error::PathTraversal { .. }));
        assert!(!temp_dir.path().join("escape.proto").exists());
        assert!(emitter.written().is_empty());
    }

    #[test]
    fn test_memory_emitter() {
        let mut emitter = MemoryEmitter::new();
        emitter.emit(&rendered("a.proto", "A")).unwrap();
        emitter.emit(&rendered("b.proto", "B")).unwrap();

        assert_eq!(emitter.get("b.proto").map(|f| f.text.as_str()), Some("B"));
        assert!(emitter.get("c.proto").is_none());
        let names: Vec<_> = emitter.into_files().into_iter().map(|f| f.name).collect();
        assert_eq!(names, ["a.proto", "b.proto"]);
    }

    #[test]
    fn test_default_root() {
        assert_eq!(DirectoryEmitter::default().root(), Path::new("protobuf"));
    }
}
