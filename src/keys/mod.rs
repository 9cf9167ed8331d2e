//! Key codec
//!
//! Maps subjects and unlike actions to storage keys. Two namespaces share
//! one keyspace:
//!
//! ```text
//! like:<subjectURI>               -> "rkey!actor;rkey!actor;..."
//! unlike:<recordKey>!<actorID>    -> ""
//! ```
//!
//! The subject URI is used verbatim by default. [`KeyLayout::Reversed`]
//! rewrites record at-uris as `collection\rkey\did`, which clusters a
//! collection's subjects together for range scans at the cost of splitting
//! a single author's records apart.

mod at_uri;

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

pub use at_uri::{AtUri, AtUriError};

/// Namespace for aggregated like records
pub const LIKE_NAMESPACE: &str = "like:";

/// Namespace for unlike markers
pub const UNLIKE_NAMESPACE: &str = "unlike:";

/// Separator between record key and actor in tokens and unlike keys
pub const TOKEN_SEPARATOR: char = '!';

/// Separator between the parts of a reversed subject key
pub const REVERSED_SEPARATOR: char = '\\';

/// How a subject URI is laid out inside its key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyLayout {
    /// The URI as-is
    #[default]
    Direct,
    /// `collection\rkey\did` for record at-uris, direct otherwise
    Reversed,
}

impl FromStr for KeyLayout {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(KeyLayout::Direct),
            "reversed" => Ok(KeyLayout::Reversed),
            _ => Err(ConfigError::UnknownKeyLayout(s.to_string())),
        }
    }
}

impl fmt::Display for KeyLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyLayout::Direct => f.write_str("direct"),
            KeyLayout::Reversed => f.write_str("reversed"),
        }
    }
}

/// Deterministic subject/action to key mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCodec {
    layout: KeyLayout,
}

impl KeyCodec {
    pub fn new(layout: KeyLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> KeyLayout {
        self.layout
    }

    /// Key holding the aggregated likes of a subject
    pub fn subject_key(&self, uri: &str) -> Vec<u8> {
        let body = match self.layout {
            KeyLayout::Direct => None,
            KeyLayout::Reversed => reversed(uri),
        };
        let body = body.as_deref().unwrap_or(uri);
        let mut key = Vec::with_capacity(LIKE_NAMESPACE.len() + body.len());
        key.extend_from_slice(LIKE_NAMESPACE.as_bytes());
        key.extend_from_slice(body.as_bytes());
        key
    }

    /// Key of the unlike marker for one record
    pub fn action_key(&self, record_key: &str, actor_id: &str) -> Vec<u8> {
        format!("{UNLIKE_NAMESPACE}{}", record_token(record_key, actor_id)).into_bytes()
    }
}

/// `recordKey!actorID`, the unit appended to an aggregated record
pub fn record_token(record_key: &str, actor_id: &str) -> String {
    format!("{record_key}{TOKEN_SEPARATOR}{actor_id}")
}

fn reversed(uri: &str) -> Option<String> {
    match uri.parse::<AtUri>().ok()? {
        AtUri::DidCollectionKey(did, collection, rkey) => Some(format!(
            "{collection}{REVERSED_SEPARATOR}{rkey}{REVERSED_SEPARATOR}{did}"
        )),
        _ => None,
    }
}
