//! Locating serialized file descriptors inside compiled binaries.
//!
//! Protobuf runtimes embed each schema file as a serialized
//! `FileDescriptorProto` whose first field is the file name. The scanner
//! finds `.proto` name suffixes, backtracks to the length-delimited tag of
//! field 1 whose length ends exactly at the suffix, then walks wire-format
//! fields forward until the record ends. A candidate is kept only if it
//! decodes as a `FileDescriptorProto` named `*.proto`.

use prost::encoding::decode_varint;
use prost::Message;
use prost_types::FileDescriptorProto;
use std::ops::Range;
use tracing::{debug, trace};

const PROTO_SUFFIX: &[u8] = b".proto";

/// Field 1 (name), wire type 2 (length-delimited)
const NAME_TAG: u8 = 0x0A;

/// Longest file name the backtracking step considers
const MAX_NAME_LEN: usize = 512;

/// Configuration for the scanner
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Maximum number of descriptors to return (0 = unlimited)
    pub max_results: usize,
    /// Records larger than this are truncated at the limit and usually rejected
    pub max_descriptor_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_results: 0,
            max_descriptor_size: 16 * 1024 * 1024,
        }
    }
}

impl ScannerConfig {
    /// Creates a new scanner config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of results to return
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Sets the maximum record size
    pub fn max_descriptor_size(mut self, size: usize) -> Self {
        self.max_descriptor_size = size;
        self
    }
}

/// Finds embedded file descriptors in arbitrary binary data
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    /// Creates a scanner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Returns the byte ranges of every descriptor found in `data`.
    pub fn scan(&self, data: &[u8]) -> Vec<Range<usize>> {
        let mut found = Vec::new();
        let mut position = 0;

        while let Some(offset) = find_subsequence(&data[position..], PROTO_SUFFIX) {
            let suffix_pos = position + offset;
            position = suffix_pos + PROTO_SUFFIX.len();

            let Some(start) = record_start(data, suffix_pos) else {
                continue;
            };
            let end = start + self.record_len(&data[start..]);
            let record = &data[start..end];

            match FileDescriptorProto::decode(record) {
                Ok(proto) if proto.name().ends_with(".proto") => {
                    debug!(file = proto.name(), range = ?(start..end), "found embedded descriptor");
                    found.push(start..end);
                    position = position.max(end);
                    if self.config.max_results > 0 && found.len() >= self.config.max_results {
                        break;
                    }
                }
                Ok(_) => trace!(start, "candidate is not a .proto descriptor"),
                Err(e) => trace!(start, error = %e, "candidate failed to decode"),
            }
        }

        debug!(count = found.len(), "scan complete");
        found
    }

    /// Length of the record starting at `data[0]`: wire fields up to the
    /// next field 1, the first invalid field, or the size limit.
    fn record_len(&self, data: &[u8]) -> usize {
        let limit = data.len().min(self.config.max_descriptor_size);
        let mut position = 0;
        let mut seen_name = false;

        while position < limit {
            let Some((field_number, len)) = skip_field(&data[position..limit]) else {
                break;
            };
            if field_number == 1 {
                if seen_name {
                    break;
                }
                seen_name = true;
            }
            position += len;
        }

        position
    }
}

/// Backtracks from a `.proto` suffix to the tag that starts its record.
fn record_start(data: &[u8], suffix_pos: usize) -> Option<usize> {
    let name_end = suffix_pos + PROTO_SUFFIX.len();
    let floor = suffix_pos.saturating_sub(MAX_NAME_LEN);

    (floor..suffix_pos).rev().find(|&i| {
        data[i] == NAME_TAG
            && read_varint(&data[i + 1..]).is_some_and(|(len, n)| {
                ((i + 1 + n) as u64).checked_add(len) == Some(name_end as u64)
            })
    })
}

fn read_varint(data: &[u8]) -> Option<(u64, usize)> {
    let mut buf = data;
    let value = decode_varint(&mut buf).ok()?;
    Some((value, data.len() - buf.len()))
}

/// Returns the field number and encoded length of the field at `data[0]`,
/// or `None` if it is not a complete, valid field.
fn skip_field(data: &[u8]) -> Option<(u64, usize)> {
    let (tag, tag_len) = read_varint(data)?;
    let field_number = tag >> 3;
    if field_number == 0 || field_number > u64::from(u32::MAX >> 3) {
        return None;
    }

    let rest = &data[tag_len..];
    let value_len = match tag & 0x07 {
        0 => read_varint(rest)?.1,
        1 => 8,
        2 => {
            let (len, n) = read_varint(rest)?;
            n.checked_add(usize::try_from(len).ok()?)?
        }
        5 => 4,
        // Groups never appear in descriptor records
        _ => return None,
    };

    (value_len <= rest.len()).then_some((field_number, tag_len + value_len))
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, package: &str) -> Vec<u8> {
        FileDescriptorProto {
            name: Some(name.to_string()),
            package: Some(package.to_string()),
            syntax: Some("proto3".to_string()),
            dependency: vec!["google/protobuf/empty.proto".to_string()],
            ..Default::default()
        }
        .encode_to_vec()
    }

    fn names(data: &[u8], ranges: &[Range<usize>]) -> Vec<String> {
        ranges
            .iter()
            .map(|r| {
                FileDescriptorProto::decode(&data[r.clone()])
                    .unwrap()
                    .name()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_find_subsequence() {
        let data = b"hello.proto.world";
        assert_eq!(find_subsequence(data, b".proto"), Some(5));
        assert_eq!(find_subsequence(data, b"missing"), None);
    }

    #[test]
    fn test_empty_and_plain_input() {
        let scanner = Scanner::new();
        assert!(scanner.scan(&[]).is_empty());
        assert!(scanner
            .scan(b"mentions file.proto but holds no descriptor")
            .is_empty());
    }

    #[test]
    fn test_finds_embedded_descriptors() {
        let first = descriptor("acme/v1/orders.proto", "acme.v1");
        let second = descriptor("abcd.proto", "short"); // name length 10 == tag byte

        let mut data = b"\x7fELF\x00\x01junk".to_vec();
        data.extend_from_slice(&first);
        data.extend_from_slice(&second);
        data.extend_from_slice(b"\x00\x00trailer");

        let ranges = Scanner::new().scan(&data);
        assert_eq!(names(&data, &ranges), ["acme/v1/orders.proto", "abcd.proto"]);
        assert_eq!(&data[ranges[0].clone()], first.as_slice());
        assert_eq!(&data[ranges[1].clone()], second.as_slice());
    }

    #[test]
    fn test_max_results() {
        let mut data = Vec::new();
        data.extend_from_slice(&descriptor("a.proto", "a"));
        data.push(0);
        data.extend_from_slice(&descriptor("b.proto", "b"));

        let scanner = Scanner::with_config(ScannerConfig::new().max_results(1));
        assert_eq!(scanner.scan(&data).len(), 1);
    }

    #[test]
    fn test_oversized_name_length_is_rejected() {
        // Name tag followed by a length varint near u64::MAX
        let mut data = vec![0x0A];
        data.extend_from_slice(&[0xFF; 9]);
        data.push(0x01);
        data.extend_from_slice(b"x.proto\x00");

        assert!(Scanner::new().scan(&data).is_empty());
    }

    #[test]
    fn test_skip_field() {
        // Field 1, varint 150
        assert_eq!(skip_field(&[0x08, 0x96, 0x01]), Some((1, 3)));
        // Field 1, length 5, "hello"
        assert_eq!(skip_field(b"\x0A\x05hello"), Some((1, 7)));
        // Field 1, fixed32 and fixed64
        assert_eq!(skip_field(&[0x0D, 1, 2, 3, 4]), Some((1, 5)));
        assert_eq!(skip_field(&[0x09, 1, 2, 3, 4, 5, 6, 7, 8]), Some((1, 9)));
        // Truncated length-delimited value
        assert_eq!(skip_field(b"\x0A\x05hel"), None);
        // Field 0 and group wire types are rejected
        assert_eq!(skip_field(&[0x00, 0x01]), None);
        assert_eq!(skip_field(&[0x0B]), None);
    }
}
