//! Error types for the reproto-core library.
//!
//! Every failure is fatal for the file being rendered and propagates to the
//! caller unchanged; nothing is retried or downgraded.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for reproto operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all reproto operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A schema feature the renderer cannot express (group fields, unknown type codes)
    #[error("{feature} not supported (in {context})")]
    UnsupportedFeature {
        /// The unsupported feature
        feature: String,
        /// Where it was encountered
        context: String,
    },

    /// Failed to parse FileDescriptorProto bytes
    #[error("failed to parse FileDescriptorProto: {0}")]
    DescriptorParse(#[from] prost::DecodeError),

    /// The descriptor decoded but cannot be rendered or resolved
    #[error("invalid descriptor: {0}")]
    DescriptorBuild(String),

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A descriptor name would place its output outside the output root
    #[error("path traversal detected: '{path}' would escape output directory")]
    PathTraversal {
        /// The offending descriptor name
        path: PathBuf,
    },

    /// No descriptors found in input
    #[error("no protobuf descriptors found in input")]
    NoDescriptorsFound,

    /// A requested root file is not known
    #[error("unknown root file '{name}'")]
    UnknownRoot {
        /// The requested file name
        name: String,
    },

    /// Formatting into the output buffer failed
    #[error("failed to render output: {0}")]
    Render(#[from] std::fmt::Error),
}

impl Error {
    /// Creates a new unsupported feature error
    pub fn unsupported(feature: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
            context: context.into(),
        }
    }

    /// Creates a new descriptor build error
    pub fn descriptor_build(msg: impl Into<String>) -> Self {
        Self::DescriptorBuild(msg.into())
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new path traversal error
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Returns true for failures caused by the descriptor content rather than the environment
    pub fn is_descriptor_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFeature { .. } | Self::DescriptorParse(_) | Self::DescriptorBuild(_)
        )
    }
}
