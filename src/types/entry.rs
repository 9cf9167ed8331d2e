//! Entry types for the like/unlike event stream

use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, ParseResult};

/// What an input line asks the store to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// A like was created (`"c"`)
    Create,
    /// A like was deleted (`"d"`)
    Delete,
}

impl Action {
    /// Wire code used in the input stream
    pub fn code(&self) -> &'static str {
        match self {
            Action::Create => "c",
            Action::Delete => "d",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        match s {
            "c" => Ok(Action::Create),
            "d" => Ok(Action::Delete),
            other => Err(ParseError::UnknownAction(other.to_string())),
        }
    }
}

/// One parsed input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub action: Action,
    /// Identity performing the action
    pub actor_id: String,
    /// Opaque per-actor record identifier
    pub record_key: String,
    /// Liked entity, only meaningful for creates
    pub subject_uri: Option<String>,
}

impl Entry {
    /// Create a like entry
    pub fn create(actor_id: &str, record_key: &str, subject_uri: &str) -> Self {
        Self {
            action: Action::Create,
            actor_id: actor_id.to_string(),
            record_key: record_key.to_string(),
            subject_uri: Some(subject_uri.to_string()),
        }
    }

    /// Create an unlike entry
    pub fn delete(actor_id: &str, record_key: &str) -> Self {
        Self {
            action: Action::Delete,
            actor_id: actor_id.to_string(),
            record_key: record_key.to_string(),
            subject_uri: None,
        }
    }

    /// Subject of a create.
    ///
    /// The parser lets a null subject through; a create without one is
    /// rejected here, before anything touches the store. Deletes never read
    /// the field.
    pub fn require_subject(&self) -> ParseResult<&str> {
        self.subject_uri
            .as_deref()
            .ok_or(ParseError::MissingSubject)
    }
}

impl FromStr for Entry {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        crate::parser::parse_line(s.as_bytes())
    }
}
