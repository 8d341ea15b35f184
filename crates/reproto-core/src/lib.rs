//! # reproto-core
//!
//! A library for recovering `.proto` source text from compiled protobuf
//! file descriptors.
//!
//! This crate provides the core functionality for:
//! - Walking a descriptor's import graph, dependencies first
//! - Rendering each `FileDescriptorProto` as schema source
//! - Writing the resulting tree under an output root with relative imports
//! - Locating serialized descriptors embedded in compiled binaries
//!
//! ## Architecture
//!
//! - [`walk`]: Dependency-ordered traversal and the [`DescriptorSource`] trait
//! - [`render`]: `.proto` text rendering
//! - [`imports`]: Relative import paths and output path checks
//! - [`emit`]: Output destinations
//! - [`index`]: Name-keyed descriptor store
//! - [`scan`]: Embedded descriptor scanner
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use reproto_core::{DescriptorIndex, DirectoryEmitter, Walker};
//! use std::fs;
//!
//! // A FileDescriptorSet, e.g. from `protoc --include_imports -o set.pb`
//! let data = fs::read("set.pb")?;
//! let index = DescriptorIndex::from_descriptor_set(&data)?;
//!
//! let mut walker = Walker::new(DirectoryEmitter::new("protobuf"));
//! walker.walk_all(&index.roots())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Callers holding a loaded [`prost_reflect::DescriptorPool`] can walk its
//! [`prost_reflect::FileDescriptor`]s directly, or use
//! [`reverse_descriptor`].

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod emit;
pub mod error;
pub mod imports;
pub mod index;
pub mod render;
pub mod scan;
pub mod walk;

// Re-export primary types for convenience
pub use emit::{DirectoryEmitter, Emitter, MemoryEmitter, DEFAULT_OUTPUT_ROOT};
pub use error::{Error, Result};
pub use index::{DescriptorIndex, IndexedFile};
pub use render::{render_file, render_proto, RenderConfig, RenderedFile};
pub use scan::{Scanner, ScannerConfig};
pub use walk::{reverse_descriptor, DescriptorSource, Walker};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
