//! at-uri parsing
//!
//! Only the shapes the key codec cares about: a bare DID, a DID plus a
//! collection, or a full DID/collection/rkey record address.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const SCHEME: &str = "at://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AtUriError {
    #[error("at-uri must start with at://")]
    MissingScheme,
    #[error("at-uri id must begin with 'did:'")]
    NotADid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtUri {
    Did(String),
    DidCollection(String, String),
    DidCollectionKey(String, String, String),
}

impl FromStr for AtUri {
    type Err = AtUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uri = s.strip_prefix(SCHEME).ok_or(AtUriError::MissingScheme)?;
        if !uri.starts_with("did:") {
            return Err(AtUriError::NotADid);
        }
        let Some((did, rest)) = uri.split_once('/') else {
            return Ok(AtUri::Did(uri.to_string()));
        };
        let Some((collection, rkey)) = rest.split_once('/') else {
            return Ok(AtUri::DidCollection(did.to_string(), rest.to_string()));
        };
        Ok(AtUri::DidCollectionKey(
            did.to_string(),
            collection.to_string(),
            rkey.to_string(),
        ))
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtUri::Did(did) => write!(f, "{SCHEME}{did}"),
            AtUri::DidCollection(did, col) => write!(f, "{SCHEME}{did}/{col}"),
            AtUri::DidCollectionKey(did, col, rkey) => write!(f, "{SCHEME}{did}/{col}/{rkey}"),
        }
    }
}
