//! Name-keyed store of serialized file descriptors.
//!
//! [`DescriptorIndex`] holds raw descriptor payloads gathered from a
//! `FileDescriptorSet` or from scanning binaries, and hands out
//! [`IndexedFile`] handles that implement [`DescriptorSource`].

use crate::error::{Error, Result};
use crate::scan::Scanner;
use crate::walk::DescriptorSource;
use bytes::Bytes;
use prost::Message;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use tracing::{trace, warn};

#[derive(Debug, Clone)]
struct IndexEntry {
    data: Bytes,
    dependencies: Vec<String>,
}

/// Serialized descriptors keyed by file name
#[derive(Debug, Clone)]
pub struct DescriptorIndex {
    files: BTreeMap<String, IndexEntry>,
    well_known_prefixes: Vec<String>,
}

impl Default for DescriptorIndex {
    fn default() -> Self {
        Self {
            files: BTreeMap::new(),
            well_known_prefixes: vec!["google/".to_string()],
        }
    }
}

impl DescriptorIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the prefixes of imports that may be absent from the index
    pub fn with_well_known_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.well_known_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Builds an index from a serialized `FileDescriptorSet`
    pub fn from_descriptor_set(data: &[u8]) -> Result<Self> {
        let set = FileDescriptorSet::decode(data)?;
        let mut index = Self::new();
        for file in &set.file {
            index.insert_proto(file);
        }
        Ok(index)
    }

    /// Adds every descriptor the scanner finds in `data`, returning how
    /// many new files were added.
    pub fn extend_from_binary(
        &mut self,
        data: impl Into<Bytes>,
        scanner: &Scanner,
    ) -> Result<usize> {
        let data = data.into();
        let mut added = 0;
        for range in scanner.scan(&data) {
            if self.insert(data.slice(range))? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Adds one serialized `FileDescriptorProto`.
    ///
    /// Returns `false` if a file with the same name is already indexed; the
    /// first occurrence always wins.
    pub fn insert(&mut self, data: Bytes) -> Result<bool> {
        let mut proto = FileDescriptorProto::decode(data.clone())?;
        let dependencies = std::mem::take(&mut proto.dependency);
        Ok(self.insert_entry(proto.name(), dependencies, data))
    }

    /// Adds one decoded `FileDescriptorProto`
    pub fn insert_proto(&mut self, proto: &FileDescriptorProto) -> bool {
        let data = Bytes::from(proto.encode_to_vec());
        self.insert_entry(proto.name(), proto.dependency.clone(), data)
    }

    fn insert_entry(&mut self, name: &str, dependencies: Vec<String>, data: Bytes) -> bool {
        if let Some(existing) = self.files.get(name) {
            if existing.data != data {
                warn!(file = name, "conflicting descriptor ignored, keeping first occurrence");
            } else {
                trace!(file = name, "duplicate descriptor ignored");
            }
            return false;
        }

        self.files
            .insert(name.to_string(), IndexEntry { data, dependencies });
        true
    }

    /// Number of indexed files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Indexed file names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.files.keys().map(String::as_str)
    }

    /// Looks up a file by name
    pub fn get(&self, name: &str) -> Option<IndexedFile<'_>> {
        self.files
            .get_key_value(name)
            .map(|(name, entry)| IndexedFile {
                index: self,
                name,
                entry,
            })
    }

    /// Looks up a file requested as a walk root
    pub fn root(&self, name: &str) -> Result<IndexedFile<'_>> {
        self.get(name).ok_or_else(|| Error::UnknownRoot {
            name: name.to_string(),
        })
    }

    /// Files that no other indexed file imports, sorted by name
    pub fn roots(&self) -> Vec<IndexedFile<'_>> {
        let imported: HashSet<&str> = self
            .files
            .values()
            .flat_map(|entry| entry.dependencies.iter().map(String::as_str))
            .collect();

        self.files
            .keys()
            .filter(|name| !imported.contains(name.as_str()))
            .filter_map(|name| self.get(name))
            .collect()
    }

    fn is_well_known(&self, name: &str) -> bool {
        self.well_known_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

/// Handle to one file inside a [`DescriptorIndex`]
#[derive(Debug, Clone, Copy)]
pub struct IndexedFile<'a> {
    index: &'a DescriptorIndex,
    name: &'a str,
    entry: &'a IndexEntry,
}

impl<'a> IndexedFile<'a> {
    /// The raw descriptor payload
    pub fn data(&self) -> &'a Bytes {
        &self.entry.data
    }

    /// Declared imports, in order
    pub fn dependencies(&self) -> &'a [String] {
        &self.entry.dependencies
    }
}

impl DescriptorSource for IndexedFile<'_> {
    fn file_name(&self) -> &str {
        self.name
    }

    fn serialized(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.entry.data)
    }

    fn imports(&self) -> Result<Vec<Self>> {
        let mut imports = Vec::with_capacity(self.entry.dependencies.len());
        for dep in &self.entry.dependencies {
            match self.index.get(dep) {
                Some(file) => imports.push(file),
                None if self.index.is_well_known(dep) => {
                    trace!(file = self.name, import = %dep, "well-known import not indexed");
                }
                None => {
                    return Err(Error::descriptor_build(format!(
                        "'{}' imports '{dep}', which was not found",
                        self.name
                    )));
                }
            }
        }
        Ok(imports)
    }
}
