//! Leak record model and the line parser that produces it.
//!
//! A line is trimmed, split on every occurrence of the shape's delimiter and
//! accepted only when the field count equals the shape's arity. No other
//! validation happens: empty fields and odd characters are kept as-is.
//!
//! Lines arrive as raw bytes. A line that is not valid UTF-8 is rejected
//! rather than repaired, so two inputs differing only in an invalid byte can
//! never collapse onto one fingerprint.
//!
//! Use [`decode_line`] on a raw input line, then [`parse_line`];
//! [`LeakRecord::fields`] yields the values in the shape's fixed column order
//! for hashing and storage.
use crate::shape::RecordShape;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LeakRecord {
    Combolist {
        user: String,
        pass: String,
    },
    Infostealer {
        url: String,
        user: String,
        pass: String,
    },
}

impl LeakRecord {
    pub fn shape(&self) -> RecordShape {
        match self {
            LeakRecord::Combolist { .. } => RecordShape::Combolist,
            LeakRecord::Infostealer { .. } => RecordShape::Infostealer,
        }
    }

    /// Field values in column order (`user,pass` or `url,user,pass`).
    pub fn fields(&self) -> Vec<&str> {
        match self {
            LeakRecord::Combolist { user, pass } => vec![user.as_str(), pass.as_str()],
            LeakRecord::Infostealer { url, user, pass } => {
                vec![url.as_str(), user.as_str(), pass.as_str()]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRejection {
    #[error("field count mismatch: expected {expected}, found {found}: {line}")]
    FieldCount {
        line: String,
        expected: usize,
        found: usize,
    },
    /// `line` is a lossy rendering, for logs only.
    #[error("line is not valid UTF-8: {line}")]
    InvalidUtf8 { line: String },
}

impl ParseRejection {
    pub fn line(&self) -> &str {
        match self {
            ParseRejection::FieldCount { line, .. } | ParseRejection::InvalidUtf8 { line } => line,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ParseRejection::FieldCount { .. } => "field count mismatch",
            ParseRejection::InvalidUtf8 { .. } => "not valid UTF-8",
        }
    }
}

/// Borrow a raw input line as text. Invalid UTF-8 is a rejection.
pub fn decode_line(raw: &[u8]) -> Result<&str, ParseRejection> {
    std::str::from_utf8(raw).map_err(|_| ParseRejection::InvalidUtf8 {
        line: String::from_utf8_lossy(raw).into_owned(),
    })
}

pub fn parse_line(line: &str, shape: RecordShape) -> Result<LeakRecord, ParseRejection> {
    let fields: Vec<&str> = line.trim().split(shape.delimiter()).collect();
    match (shape, fields.as_slice()) {
        (RecordShape::Combolist, [user, pass]) => Ok(LeakRecord::Combolist {
            user: user.to_string(),
            pass: pass.to_string(),
        }),
        (RecordShape::Infostealer, [url, user, pass]) => Ok(LeakRecord::Infostealer {
            url: url.to_string(),
            user: user.to_string(),
            pass: pass.to_string(),
        }),
        _ => Err(ParseRejection::FieldCount {
            line: line.to_string(),
            expected: shape.arity(),
            found: fields.len(),
        }),
    }
}
