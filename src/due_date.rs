use chrono::NaiveDateTime;
use thiserror::Error;

/// `MM/DD/YY hh:mm AM/PM`, e.g. `05/20/24 03:00 PM`.
pub const DUE_DATE_FORMAT: &str = "%m/%d/%y %I:%M %p";

const MARKER_OPEN: &str = " (Due: ";
const MARKER_CLOSE: char = ')';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bad date format: {input:?}")]
pub struct FormatError {
    pub input: String,
}

/// Parses a due date in the fixed `MM/DD/YY hh:mm AM/PM` shape.
///
/// The shape is checked before handing off to chrono, which would otherwise
/// accept single-digit fields and lowercase meridiems.
pub fn parse(text: &str) -> Result<NaiveDateTime, FormatError> {
    let err = || FormatError {
        input: text.to_string(),
    };
    if !has_fixed_shape(text) {
        return Err(err());
    }
    NaiveDateTime::parse_from_str(text, DUE_DATE_FORMAT).map_err(|_| err())
}

pub fn format(due: &NaiveDateTime) -> String {
    due.format(DUE_DATE_FORMAT).to_string()
}

/// Renders the `(Due: ...)` suffix appended to a task's display text.
pub fn marker(due: &NaiveDateTime) -> String {
    format!("{}{}{}", MARKER_OPEN, format(due), MARKER_CLOSE)
}

/// Splits a display line into its description and due date.
///
/// Only a trailing marker counts, so a description that happens to contain
/// `(Due: ` earlier on is left alone.
pub fn split_marker(line: &str) -> Option<(&str, NaiveDateTime)> {
    let inner = line.strip_suffix(MARKER_CLOSE)?;
    let start = inner.rfind(MARKER_OPEN)?;
    let due = parse(&inner[start + MARKER_OPEN.len()..]).ok()?;
    Some((&line[..start], due))
}

pub fn extract_due_date(display_text: &str) -> Option<NaiveDateTime> {
    split_marker(display_text).map(|(_, due)| due)
}

fn has_fixed_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != 17 {
        return false;
    }
    let digits = [0, 1, 3, 4, 6, 7, 9, 10, 12, 13];
    digits.iter().all(|&i| bytes[i].is_ascii_digit())
        && bytes[2] == b'/'
        && bytes[5] == b'/'
        && bytes[8] == b' '
        && bytes[11] == b':'
        && bytes[14] == b' '
        && matches!(&bytes[15..], b"AM" | b"PM")
}
