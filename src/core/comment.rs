//! Comment records and the newline-delimited wire format they arrive in.
//!
//! A wire line is `timestampMs <D> nickFlag <D> text` where `<D>` is the
//! configured delimiter. The text is everything after the second delimiter,
//! so it may contain the delimiter itself.

use crate::core::time::Millis;

/// Why a raw line could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedLine {
    #[error("expected 3 fields, found {found}")]
    FieldCount { found: usize },
    #[error("timestamp is not an integer: {0:?}")]
    Timestamp(String),
    #[error("nickname flag is not 0/1: {0:?}")]
    NicknameFlag(String),
    #[error("line of {len} bytes exceeds the {limit} byte limit")]
    TooLong { len: usize, limit: usize },
}

/// A single comment waiting in (or consumed from) the comment queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub text: String,
    /// Local, monotonically increasing ingestion counter
    pub arrival_order: u64,
    /// Video-relative display time (milliseconds)
    pub scheduled_pts: Millis,
    /// Text starts with "<nick><separator>"
    pub is_nickname_prefixed: bool,
    /// Set exactly once, when the scheduler displays or discards the record
    pub read: bool,
    /// A lane lookup already failed once under the retry-once policy
    pub retried: bool,
}

impl CommentRecord {
    /// Create a new unread record
    pub fn new(
        text: impl Into<String>,
        arrival_order: u64,
        scheduled_pts: Millis,
        is_nickname_prefixed: bool,
    ) -> Self {
        Self {
            text: text.into(),
            arrival_order,
            scheduled_pts,
            is_nickname_prefixed,
            read: false,
            retried: false,
        }
    }

    /// Blank records occupy a queue slot but never reach a lane
    pub fn is_placeholder(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Message body with the nickname prefix removed, if there is one
    pub fn message<'a>(&'a self, separator: &str) -> &'a str {
        if !self.is_nickname_prefixed || separator.is_empty() {
            return &self.text;
        }
        match self.text.split_once(separator) {
            Some((_, message)) => message,
            None => &self.text,
        }
    }
}

/// Parse one raw line off the source channel.
pub fn parse_line(
    line: &str,
    delimiter: char,
    arrival_order: u64,
) -> Result<CommentRecord, MalformedLine> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = line.splitn(3, delimiter);

    let (timestamp, flag, text) = match (fields.next(), fields.next(), fields.next()) {
        (Some(ts), Some(flag), Some(text)) => (ts, flag, text),
        (first, second, _) => {
            let found = [first, second].iter().filter(|f| f.is_some()).count();
            return Err(MalformedLine::FieldCount { found });
        }
    };

    let scheduled_pts = timestamp
        .trim()
        .parse::<Millis>()
        .map_err(|_| MalformedLine::Timestamp(timestamp.to_string()))?;

    let is_nickname_prefixed = match flag.trim() {
        "1" | "true" => true,
        "0" | "false" => false,
        other => return Err(MalformedLine::NicknameFlag(other.to_string())),
    };

    Ok(CommentRecord::new(text, arrival_order, scheduled_pts, is_nickname_prefixed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        let record = parse_line("1500\t0\thello world\n", '\t', 7).unwrap();
        assert_eq!(record.text, "hello world");
        assert_eq!(record.scheduled_pts, 1500);
        assert_eq!(record.arrival_order, 7);
        assert!(!record.is_nickname_prefixed);
        assert!(!record.read);
    }

    #[test]
    fn test_text_may_contain_delimiter() {
        let record = parse_line("10|1|alice: a|b|c", '|', 0).unwrap();
        assert_eq!(record.text, "alice: a|b|c");
        assert!(record.is_nickname_prefixed);
    }

    #[test]
    fn test_field_count() {
        assert_eq!(
            parse_line("1500", '\t', 0),
            Err(MalformedLine::FieldCount { found: 1 })
        );
        assert_eq!(
            parse_line("1500\t1", '\t', 0),
            Err(MalformedLine::FieldCount { found: 2 })
        );
    }

    #[test]
    fn test_bad_timestamp() {
        assert_eq!(
            parse_line("soon\t0\thi", '\t', 0),
            Err(MalformedLine::Timestamp("soon".to_string()))
        );
    }

    #[test]
    fn test_bad_flag() {
        assert!(matches!(
            parse_line("1\tyes\thi", '\t', 0),
            Err(MalformedLine::NicknameFlag(_))
        ));
    }

    #[test]
    fn test_negative_and_crlf() {
        let record = parse_line("-20\ttrue\tbob: hey\r\n", '\t', 0).unwrap();
        assert_eq!(record.scheduled_pts, -20);
        assert_eq!(record.text, "bob: hey");
    }

    #[test]
    fn test_message_strips_nick() {
        let record = CommentRecord::new("bob: hey: there", 0, 0, true);
        assert_eq!(record.message(": "), "hey: there");

        let plain = CommentRecord::new("bob: hey", 0, 0, false);
        assert_eq!(plain.message(": "), "bob: hey");
    }

    #[test]
    fn test_placeholder() {
        assert!(parse_line("5\t0\t   ", '\t', 0).unwrap().is_placeholder());
        assert!(!CommentRecord::new("x", 0, 0, false).is_placeholder());
    }
}
