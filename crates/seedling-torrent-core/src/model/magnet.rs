//! Magnet URI parsing.
//!
//! Supports `xt=urn:btih:` (hex or base32 SHA-1) and `xt=urn:btmh:` (hex
//! multihash SHA-256), plus display name, tracker, and peer hints.

use data_encoding::BASE32;
use seedling_events::JobId;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{TorrentError, TorrentResult};

const BTIH_PREFIX: &str = "urn:btih:";
const BTMH_PREFIX: &str = "urn:btmh:";
/// Multihash header for a 32-byte SHA-256 digest.
const SHA256_MULTIHASH: [u8; 2] = [0x12, 0x20];

/// Parsed magnet link: a bare identity plus discovery hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagnetLink {
    /// Identity derived from the exact-topic parameters.
    pub id: JobId,
    /// Display name (`dn`).
    pub display_name: Option<String>,
    /// Tracker hints (`tr`).
    pub trackers: Vec<String>,
    /// Peer hints (`x.pe`).
    pub peers: Vec<String>,
    /// The original URI.
    pub uri: String,
}

impl MagnetLink {
    /// Parse a magnet URI.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::InvalidMagnet`] when the URI is not a magnet
    /// link or carries no usable info hash.
    pub fn parse(uri: &str) -> TorrentResult<Self> {
        let trimmed = uri.trim();
        let url = Url::parse(trimmed).map_err(|_| TorrentError::magnet("not_a_uri"))?;
        if url.scheme() != "magnet" {
            return Err(TorrentError::magnet("not_a_magnet"));
        }

        let mut v1 = None;
        let mut v2 = None;
        let mut display_name = None;
        let mut trackers = Vec::new();
        let mut peers = Vec::new();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "xt" => {
                    if let Some(hash) = value.strip_prefix(BTIH_PREFIX) {
                        v1 = Some(decode_btih(hash)?);
                    } else if let Some(hash) = value.strip_prefix(BTMH_PREFIX) {
                        v2 = Some(decode_btmh(hash)?);
                    }
                }
                "dn" if !value.trim().is_empty() => display_name = Some(value.into_owned()),
                "tr" => trackers.push(value.into_owned()),
                "x.pe" => peers.push(value.into_owned()),
                _ => {}
            }
        }

        let id = JobId::hybrid(v1, v2).ok_or(TorrentError::magnet("missing_info_hash"))?;
        Ok(Self {
            id,
            display_name,
            trackers,
            peers,
            uri: trimmed.to_string(),
        })
    }
}

fn decode_btih(hash: &str) -> TorrentResult<[u8; 20]> {
    let bytes = match hash.len() {
        40 => hex::decode(hash).map_err(|_| TorrentError::magnet("invalid_btih_hex"))?,
        32 => BASE32
            .decode(hash.to_ascii_uppercase().as_bytes())
            .map_err(|_| TorrentError::magnet("invalid_btih_base32"))?,
        _ => return Err(TorrentError::magnet("invalid_btih_length")),
    };
    <[u8; 20]>::try_from(bytes.as_slice()).map_err(|_| TorrentError::magnet("invalid_btih_length"))
}

fn decode_btmh(hash: &str) -> TorrentResult<[u8; 32]> {
    let bytes = hex::decode(hash).map_err(|_| TorrentError::magnet("invalid_btmh_hex"))?;
    let digest = bytes
        .strip_prefix(&SHA256_MULTIHASH)
        .ok_or(TorrentError::magnet("unsupported_multihash"))?;
    <[u8; 32]>::try_from(digest).map_err(|_| TorrentError::magnet("invalid_btmh_length"))
}
