use data_encoding::{BASE32, HEXUPPER};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::AcquireError;

/// A torrent chosen for acquisition.
///
/// Built once from a content hash (or a ready-made magnet URI) and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentTarget {
    content_identifier: String,
    magnet_reference: String,
    display_name: Option<String>,
}

fn hash_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[0-9A-Fa-f]{40}|[0-9A-Fa-f]{64}|[A-Za-z2-7]{32})$")
            .expect("hash pattern is valid")
    })
}

fn magnet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)[?&]xt=urn:btih:([0-9a-f]{40}|[a-z2-7]{32})")
            .expect("magnet pattern is valid")
    })
}

/// Agents report info-hashes as hex, so base32 btih values are converted
/// up front. Hex input is returned unchanged.
fn normalize_hash(hash: &str) -> Result<String, AcquireError> {
    if hash.len() != 32 {
        return Ok(hash.to_string());
    }
    BASE32
        .decode(hash.to_ascii_uppercase().as_bytes())
        .map(|bytes| HEXUPPER.encode(&bytes))
        .map_err(|e| AcquireError::InvalidTarget(format!("bad base32 hash '{}': {}", hash, e)))
}

fn display_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[?&]dn=([^&]+)").expect("dn pattern is valid"))
}

impl TorrentTarget {
    /// Create a target from a content hash, building its magnet reference
    /// from the given tracker list.
    pub fn new(
        content_identifier: &str,
        display_name: Option<&str>,
        trackers: &[String],
    ) -> Result<Self, AcquireError> {
        let content_identifier = content_identifier.trim();
        if !hash_pattern().is_match(content_identifier) {
            return Err(AcquireError::InvalidTarget(format!(
                "'{}' is not a torrent hash",
                content_identifier
            )));
        }

        let content_identifier = normalize_hash(content_identifier)?;
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let magnet_reference =
            build_magnet(&content_identifier, display_name.as_deref(), trackers);

        Ok(Self {
            content_identifier,
            magnet_reference,
            display_name,
        })
    }

    /// Create a target from an existing magnet URI. The URI is kept verbatim.
    pub fn from_magnet(magnet: &str) -> Result<Self, AcquireError> {
        let magnet = magnet.trim();
        let content_identifier = magnet_pattern()
            .captures(magnet)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| {
                AcquireError::InvalidTarget(format!("magnet URI has no btih hash: {}", magnet))
            })
            .and_then(|m| normalize_hash(m.as_str()))?;

        let display_name = display_name_pattern()
            .captures(magnet)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().replace('+', " "))
            .map(|raw| {
                urlencoding::decode(&raw)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or(raw)
            })
            .filter(|name| !name.trim().is_empty());

        Ok(Self {
            content_identifier,
            magnet_reference: magnet.to_string(),
            display_name,
        })
    }

    /// Parse command-line input: a bare hash, `HASH=Display Name`, or a
    /// magnet URI.
    pub fn parse(input: &str, trackers: &[String]) -> Result<Self, AcquireError> {
        let input = input.trim();
        if input.to_ascii_lowercase().starts_with("magnet:") {
            return Self::from_magnet(input);
        }

        match input.split_once('=') {
            Some((hash, name)) => Self::new(hash, Some(name), trackers),
            None => Self::new(input, None, trackers),
        }
    }

    pub fn content_identifier(&self) -> &str {
        &self.content_identifier
    }

    pub fn magnet_reference(&self) -> &str {
        &self.magnet_reference
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Whether the magnet reference is something a user can paste into a
    /// client by hand.
    pub fn has_usable_magnet(&self) -> bool {
        self.magnet_reference
            .get(..8)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("magnet:?"))
    }

    /// Name to show the user: the display name if known, else the hash.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or(&self.content_identifier)
    }
}

fn build_magnet(hash: &str, display_name: Option<&str>, trackers: &[String]) -> String {
    let mut magnet = format!("magnet:?xt=urn:btih:{}", hash);
    if let Some(name) = display_name {
        magnet.push_str("&dn=");
        magnet.push_str(&urlencoding::encode(name));
    }
    for tracker in trackers {
        magnet.push_str("&tr=");
        magnet.push_str(&urlencoding::encode(tracker));
    }
    magnet
}
