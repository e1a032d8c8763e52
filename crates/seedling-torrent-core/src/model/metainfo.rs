//! `.torrent` metainfo decoding.
//!
//! Only the fields the shell needs are extracted: the declared name, the file
//! listing, tracker hints, and the v1/v2 identity digested from the raw
//! `info` dictionary bytes.

use seedling_events::{JobId, JobMetadata, MetadataFile};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::error::{TorrentError, TorrentResult};

const MAX_DEPTH: usize = 64;

/// Decoded `.torrent` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metainfo {
    /// Identity digested from the `info` dictionary.
    pub id: JobId,
    /// Declared name.
    pub name: String,
    /// File listing with sizes.
    pub files: Vec<MetadataFile>,
    /// Announce URLs in tier order.
    pub trackers: Vec<String>,
    /// Original bencoded payload, handed to the engine untouched.
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl Metainfo {
    /// Decode a bencoded `.torrent` payload.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::InvalidMetainfo`] when the payload is not valid
    /// bencode or lacks a usable `info` dictionary.
    pub fn from_bytes(bytes: &[u8]) -> TorrentResult<Self> {
        let mut parser = Parser { input: bytes, pos: 0 };
        let root = parser.value(0)?;
        if parser.pos != bytes.len() {
            return Err(TorrentError::metainfo("trailing_bytes", Some(parser.pos)));
        }
        let Value::Dict(root) = root else {
            return Err(TorrentError::metainfo("root_not_dict", Some(0)));
        };
        let info_entry = lookup_entry(&root, b"info")
            .ok_or(TorrentError::metainfo("missing_info", None))?;
        let Value::Dict(info) = &info_entry.value else {
            return Err(TorrentError::metainfo("info_not_dict", None));
        };

        let name = lookup_str(info, b"name.utf-8")
            .or_else(|| lookup_str(info, b"name"))
            .filter(|name| !name.trim().is_empty())
            .ok_or(TorrentError::metainfo("missing_name", None))?;

        let v1 = lookup(info, b"pieces").map(|_| {
            let mut digest = [0_u8; 20];
            digest.copy_from_slice(&Sha1::digest(info_entry.raw));
            digest
        });
        let v2 = matches!(lookup(info, b"meta version"), Some(Value::Int(2))).then(|| {
            let mut digest = [0_u8; 32];
            digest.copy_from_slice(&Sha256::digest(info_entry.raw));
            digest
        });
        let id = JobId::hybrid(v1, v2)
            .ok_or(TorrentError::metainfo("missing_piece_layout", None))?;

        let files = collect_files(info, &name)?;
        Ok(Self {
            id,
            name,
            files,
            trackers: collect_trackers(&root),
            raw: bytes.to_vec(),
        })
    }

    /// Total payload size in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|file| file.size).sum()
    }

    /// Metadata view handed to confirmation surfaces.
    #[must_use]
    pub fn metadata(&self) -> JobMetadata {
        JobMetadata {
            name: self.name.clone(),
            total_size: self.total_size(),
            files: self.files.clone(),
        }
    }
}

fn collect_files(info: &[Entry<'_>], name: &str) -> TorrentResult<Vec<MetadataFile>> {
    if let Some(Value::Int(length)) = lookup(info, b"length") {
        return Ok(vec![MetadataFile {
            path: name.to_string(),
            size: non_negative(*length)?,
        }]);
    }

    if let Some(Value::List(entries)) = lookup(info, b"files") {
        let mut files = Vec::with_capacity(entries.len());
        for entry in entries {
            let Value::Dict(entry) = entry else {
                return Err(TorrentError::metainfo("file_not_dict", None));
            };
            let Some(Value::Int(length)) = lookup(entry, b"length") else {
                return Err(TorrentError::metainfo("file_missing_length", None));
            };
            let segments = match lookup(entry, b"path.utf-8").or_else(|| lookup(entry, b"path")) {
                Some(Value::List(segments)) => segments
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>(),
                _ => return Err(TorrentError::metainfo("file_missing_path", None)),
            };
            files.push(MetadataFile {
                path: format!("{name}/{}", segments.join("/")),
                size: non_negative(*length)?,
            });
        }
        return Ok(files);
    }

    if let Some(Value::Dict(tree)) = lookup(info, b"file tree") {
        let mut files = Vec::new();
        walk_file_tree(tree, name, &mut files, 0)?;
        return Ok(files);
    }

    Err(TorrentError::metainfo("missing_file_layout", None))
}

fn walk_file_tree(
    node: &[Entry<'_>],
    prefix: &str,
    files: &mut Vec<MetadataFile>,
    depth: usize,
) -> TorrentResult<()> {
    if depth > MAX_DEPTH {
        return Err(TorrentError::metainfo("file_tree_too_deep", None));
    }
    for entry in node {
        let Value::Dict(child) = &entry.value else {
            continue;
        };
        if entry.key.is_empty() {
            if let Some(Value::Int(length)) = lookup(child, b"length") {
                files.push(MetadataFile {
                    path: prefix.to_string(),
                    size: non_negative(*length)?,
                });
            }
            continue;
        }
        let segment = String::from_utf8_lossy(entry.key);
        walk_file_tree(child, &format!("{prefix}/{segment}"), files, depth + 1)?;
    }
    Ok(())
}

fn collect_trackers(root: &[Entry<'_>]) -> Vec<String> {
    let mut trackers = Vec::new();
    if let Some(announce) = lookup_str(root, b"announce") {
        trackers.push(announce);
    }
    if let Some(Value::List(tiers)) = lookup(root, b"announce-list") {
        for tier in tiers {
            if let Value::List(urls) = tier {
                for url in urls.iter().filter_map(Value::as_str) {
                    if !trackers.iter().any(|known| known == url) {
                        trackers.push(url.to_string());
                    }
                }
            }
        }
    }
    trackers
}

fn non_negative(value: i64) -> TorrentResult<u64> {
    u64::try_from(value).map_err(|_| TorrentError::metainfo("negative_length", None))
}

fn lookup_entry<'d, 'a>(dict: &'d [Entry<'a>], key: &[u8]) -> Option<&'d Entry<'a>> {
    dict.iter().find(|entry| entry.key == key)
}

fn lookup<'d, 'a>(dict: &'d [Entry<'a>], key: &[u8]) -> Option<&'d Value<'a>> {
    lookup_entry(dict, key).map(|entry| &entry.value)
}

fn lookup_str(dict: &[Entry<'_>], key: &[u8]) -> Option<String> {
    lookup(dict, key).and_then(Value::as_str).map(str::to_string)
}

enum Value<'a> {
    Int(i64),
    Bytes(&'a [u8]),
    List(Vec<Value<'a>>),
    Dict(Vec<Entry<'a>>),
}

impl<'a> Value<'a> {
    fn as_str(&self) -> Option<&'a str> {
        match self {
            Self::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}

struct Entry<'a> {
    key: &'a [u8],
    value: Value<'a>,
    /// Raw encoded bytes of `value`.
    raw: &'a [u8],
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn value(&mut self, depth: usize) -> TorrentResult<Value<'a>> {
        if depth > MAX_DEPTH {
            return Err(TorrentError::metainfo("nesting_too_deep", Some(self.pos)));
        }
        match self.peek()? {
            b'i' => {
                self.pos += 1;
                let digits = self.take_until(b'e')?;
                let text = std::str::from_utf8(digits)
                    .map_err(|_| TorrentError::metainfo("invalid_integer", Some(self.pos)))?;
                text.parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| TorrentError::metainfo("invalid_integer", Some(self.pos)))
            }
            b'l' => {
                self.pos += 1;
                let mut items = Vec::new();
                while self.peek()? != b'e' {
                    items.push(self.value(depth + 1)?);
                }
                self.pos += 1;
                Ok(Value::List(items))
            }
            b'd' => {
                self.pos += 1;
                let mut entries = Vec::new();
                let input = self.input;
                while self.peek()? != b'e' {
                    let key = self.bytes()?;
                    let start = self.pos;
                    let value = self.value(depth + 1)?;
                    entries.push(Entry {
                        key,
                        value,
                        raw: &input[start..self.pos],
                    });
                }
                self.pos += 1;
                Ok(Value::Dict(entries))
            }
            b'0'..=b'9' => self.bytes().map(Value::Bytes),
            _ => Err(TorrentError::metainfo("unexpected_token", Some(self.pos))),
        }
    }

    fn bytes(&mut self) -> TorrentResult<&'a [u8]> {
        let start = self.pos;
        let digits = self.take_until(b':')?;
        let length = std::str::from_utf8(digits)
            .ok()
            .and_then(|text| text.parse::<usize>().ok())
            .ok_or(TorrentError::metainfo("invalid_string_length", Some(start)))?;
        let input = self.input;
        let end = self
            .pos
            .checked_add(length)
            .filter(|end| *end <= input.len())
            .ok_or(TorrentError::metainfo("truncated", Some(self.pos)))?;
        let slice = &input[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_until(&mut self, terminator: u8) -> TorrentResult<&'a [u8]> {
        let input = self.input;
        let rest = &input[self.pos..];
        let offset = rest
            .iter()
            .position(|byte| *byte == terminator)
            .ok_or(TorrentError::metainfo("truncated", Some(self.pos)))?;
        let slice = &rest[..offset];
        self.pos += offset + 1;
        Ok(slice)
    }

    fn peek(&self) -> TorrentResult<u8> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(TorrentError::metainfo("truncated", Some(self.pos)))
    }
}
