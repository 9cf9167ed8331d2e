//! Event parser
//!
//! Decodes one input line, a JSON array `[action, actorID, recordKey, subjectURI]`
//! whose elements are strings or null, into an [`Entry`].
//!
//! Checks run in a fixed order and the first violation wins:
//! structure, arity, action, actor, record key. The subject is passed through
//! as-is; whether a create carries one is checked by the caller.

use crate::error::{ParseError, ParseResult};
use crate::types::{Action, Entry};

/// Number of positional fields in a record
pub const RECORD_ARITY: usize = 4;

/// Parse a single line of input
pub fn parse_line(line: &[u8]) -> ParseResult<Entry> {
    let fields: Vec<Option<String>> =
        serde_json::from_slice(line).map_err(ParseError::MalformedRecord)?;

    if fields.len() != RECORD_ARITY {
        return Err(ParseError::WrongArity(fields.len()));
    }

    let mut fields = fields.into_iter();
    let mut next = || fields.next().flatten();

    let action: Action = next().ok_or(ParseError::MissingAction)?.parse()?;
    let actor_id = next().ok_or(ParseError::MissingActor)?;
    let record_key = next().ok_or(ParseError::MissingRecordKey)?;
    let subject_uri = next();

    Ok(Entry {
        action,
        actor_id,
        record_key,
        subject_uri,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let entry = parse_line(br#"["c","did:A","3k","at://did:B/app.bsky.feed.post/x"]"#).unwrap();
        assert_eq!(entry.action, Action::Create);
        assert_eq!(entry.actor_id, "did:A");
        assert_eq!(entry.record_key, "3k");
        assert_eq!(entry.subject_uri.as_deref(), Some("at://did:B/app.bsky.feed.post/x"));
    }

    #[test]
    fn test_parse_delete_with_null_subject() {
        let entry = parse_line(br#"["d","did:A","3k",null]"#).unwrap();
        assert_eq!(entry, Entry::delete("did:A", "3k"));
    }

    #[test]
    fn test_create_with_null_subject_passes_through() {
        let entry = parse_line(br#"["c","did:A","3k",null]"#).unwrap();
        assert_eq!(entry.action, Action::Create);
        assert!(entry.subject_uri.is_none());
    }

    #[test]
    fn test_malformed_record() {
        let lines: [&[u8]; 5] = [b"not json", b"{\"a\":1}", b"[1,2,3,4]", b"", b"[\"c\",\"did:A\""];
        for line in lines {
            assert!(
                matches!(parse_line(line), Err(ParseError::MalformedRecord(_))),
                "{:?}",
                String::from_utf8_lossy(line)
            );
        }
    }

    #[test]
    fn test_wrong_arity() {
        assert!(matches!(
            parse_line(br#"["d","3k","did:A"]"#),
            Err(ParseError::WrongArity(3))
        ));
        assert!(matches!(
            parse_line(br#"["c","did:A","3k","at://x",null]"#),
            Err(ParseError::WrongArity(5))
        ));
    }

    #[test]
    fn test_action_checks() {
        assert!(matches!(
            parse_line(br#"[null,"did:A","3k",null]"#),
            Err(ParseError::MissingAction)
        ));
        assert!(matches!(
            parse_line(br#"["x","did1","rk1","at://did:B/app.bsky.feed.post/x"]"#),
            Err(ParseError::UnknownAction(a)) if a == "x"
        ));
    }

    #[test]
    fn test_first_violation_wins() {
        // unknown action is reported before the missing actor and record key
        assert!(matches!(
            parse_line(br#"["x",null,null,null]"#),
            Err(ParseError::UnknownAction(_))
        ));
        assert!(matches!(
            parse_line(br#"["c",null,null,null]"#),
            Err(ParseError::MissingActor)
        ));
        assert!(matches!(
            parse_line(br#"["c","did:A",null,null]"#),
            Err(ParseError::MissingRecordKey)
        ));
    }

    #[test]
    fn test_deterministic() {
        let line = br#"["c","did:A","3k","at://did:B/app.bsky.feed.post/x"]"#;
        assert_eq!(parse_line(line).unwrap(), parse_line(line).unwrap());
    }
}
