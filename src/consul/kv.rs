//! Consul KV wire types.
//!
//! `GET /v1/kv/<key>` answers with a JSON array of entries whose `Value`
//! is base64 encoded, or `null` when the key holds no data.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;

use crate::errors::{FetchError, Result};

/// Bytes escaped inside one `/`-separated segment of the key path.
const KEY_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// What to fetch and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Bare host, optionally with a port. Always reached over https.
    pub host: String,
    /// Key name as given by the caller.
    pub key: String,
}

impl FetchRequest {
    /// Key path as sent to Consul, without a leading slash.
    pub fn key_path(&self) -> &str {
        self.key.trim_start_matches('/')
    }

    /// Key path with each segment percent-encoded for use in a URL.
    pub fn encoded_key_path(&self) -> String {
        self.key_path()
            .split('/')
            .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Full URL of the KV read endpoint for this key.
    pub fn url(&self) -> String {
        self.url_with_scheme("https")
    }

    pub(crate) fn url_with_scheme(&self, scheme: &str) -> String {
        format!(
            "{scheme}://{}/v1/kv/{}",
            self.host,
            self.encoded_key_path()
        )
    }
}

/// One key/value pair returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
    pub flags: u64,
    pub modify_index: u64,
}

/// A single entry of the JSON array Consul returns.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KvEntry {
    key: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    flags: u64,
    #[serde(default)]
    modify_index: u64,
}

impl TryFrom<KvEntry> for KvPair {
    type Error = FetchError;

    fn try_from(entry: KvEntry) -> Result<Self> {
        let value = match entry.value {
            Some(encoded) => BASE64.decode(encoded.as_bytes()).map_err(|e| {
                FetchError::InvalidResponse(format!("value of '{}' is not base64: {e}", entry.key))
            })?,
            None => Vec::new(),
        };

        Ok(KvPair {
            key: entry.key,
            value,
            flags: entry.flags,
            modify_index: entry.modify_index,
        })
    }
}

/// Decode the body of a successful KV read.
///
/// An empty array means the key does not exist. A `null` value is a
/// present key with an empty value.
pub fn decode_kv_response(body: &[u8]) -> Result<Option<KvPair>> {
    let entries: Vec<KvEntry> = serde_json::from_slice(body)
        .map_err(|e| FetchError::InvalidResponse(format!("malformed KV JSON: {e}")))?;

    entries.into_iter().next().map(KvPair::try_from).transpose()
}
