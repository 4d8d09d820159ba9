//! Tagged-field codec for the `<NAME:LEN[:TYPE]>value` wire format.
//!
//! The value span is delimited by the explicit length in the tag, never by
//! scanning for the next `<`, so values may embed any characters including
//! tag-shaped text. Lengths count characters, not bytes.

use std::fmt;

/// End-of-record marker name.
pub const EOR_MARKER: &str = "EOR";
/// End-of-header marker name.
pub const EOH_MARKER: &str = "EOH";

/// Structural parse failure, reported at the byte offset where it was
/// detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No `<` at the expected position, or the tag name is empty/invalid.
    MalformedTag {
        /// Byte offset of the offending tag.
        offset: usize,
    },
    /// The length segment is not a non-negative integer.
    InvalidLength {
        /// Byte offset of the offending tag.
        offset: usize,
    },
    /// No closing `>` before end of input.
    UnterminatedTag {
        /// Byte offset of the offending tag.
        offset: usize,
    },
    /// Input ended before the record or header terminator was found.
    MissingTerminator {
        /// Byte offset of the end of input.
        offset: usize,
    },
    /// Input ended inside a declared value span.
    TruncatedInput {
        /// Byte offset of the end of input.
        offset: usize,
    },
}

impl ParseError {
    /// Byte offset at which the failure was detected.
    pub fn offset(&self) -> usize {
        match self {
            Self::MalformedTag { offset }
            | Self::InvalidLength { offset }
            | Self::UnterminatedTag { offset }
            | Self::MissingTerminator { offset }
            | Self::TruncatedInput { offset } => *offset,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedTag { offset } => write!(f, "malformed tag at offset {offset}"),
            Self::InvalidLength { offset } => write!(f, "invalid field length at offset {offset}"),
            Self::UnterminatedTag { offset } => write!(f, "unterminated tag at offset {offset}"),
            Self::MissingTerminator { offset } => {
                write!(f, "input ended without terminator at offset {offset}")
            }
            Self::TruncatedInput { offset } => {
                write!(f, "input ended inside a value at offset {offset}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// One token produced by [`parse_field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldToken {
    /// A data field with an explicit-length value.
    Field {
        /// Uppercased field name.
        name: String,
        /// Value span, exactly the declared number of characters.
        value: String,
        /// Optional data-type indicator from a three-segment tag.
        type_hint: Option<String>,
        /// Byte offset immediately after the value.
        next: usize,
    },
    /// A valueless marker tag such as `<EOR>` or `<EOH>`.
    Marker {
        /// Uppercased marker name.
        name: String,
        /// Byte offset immediately after the `>`.
        next: usize,
    },
}

impl FieldToken {
    /// Byte offset immediately after this token.
    pub fn next_offset(&self) -> usize {
        match self {
            Self::Field { next, .. } | Self::Marker { next, .. } => *next,
        }
    }
}

/// Parses one tag starting at `offset`, skipping any leading whitespace.
///
/// A tag with a length segment yields [`FieldToken::Field`] whose value is
/// exactly `LEN` characters; a tag without one yields [`FieldToken::Marker`].
pub fn parse_field(text: &str, offset: usize) -> Result<FieldToken, ParseError> {
    let rest = &text[offset..];
    let start = offset + (rest.len() - rest.trim_start().len());

    if !text[start..].starts_with('<') {
        return Err(ParseError::MalformedTag { offset: start });
    }

    let gt = match text[start + 1..].find('>') {
        Some(i) => start + 1 + i,
        None => return Err(ParseError::UnterminatedTag { offset: start }),
    };

    let mut segments = text[start + 1..gt].splitn(3, ':');
    let name = segments.next().unwrap_or("");
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(ParseError::MalformedTag { offset: start });
    }
    let name = name.to_ascii_uppercase();

    let len_segment = match segments.next() {
        Some(s) => s,
        None => {
            return Ok(FieldToken::Marker {
                name,
                next: gt + 1,
            });
        }
    };
    let len: usize = len_segment
        .parse()
        .map_err(|_| ParseError::InvalidLength { offset: start })?;
    let type_hint = segments.next().filter(|s| !s.is_empty()).map(str::to_string);

    let body = &text[gt + 1..];
    let end = char_span_end(body, len).ok_or(ParseError::TruncatedInput {
        offset: text.len(),
    })?;

    Ok(FieldToken::Field {
        name,
        value: body[..end].to_string(),
        type_hint,
        next: gt + 1 + end,
    })
}

/// Renders one field as `<NAME:LEN>value` with the length computed from the
/// actual value in characters.
pub fn format_field(name: &str, value: &str) -> String {
    format!(
        "<{}:{}>{}",
        name.trim().to_ascii_uppercase(),
        value.chars().count(),
        value
    )
}

/// Byte length of the first `count` characters of `s`, or `None` when `s`
/// holds fewer characters.
fn char_span_end(s: &str, count: usize) -> Option<usize> {
    if count == 0 {
        return Some(0);
    }
    let mut remaining = count;
    for (i, c) in s.char_indices() {
        remaining -= 1;
        if remaining == 0 {
            return Some(i + c.len_utf8());
        }
    }
    None
}
