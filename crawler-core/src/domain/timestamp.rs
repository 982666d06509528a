//! Timestamp parsing
//!
//! Both the tracking service and the on-disk store use a single textual
//! format, `YYYY-MM-DDTHH:MM:SS.ffffff`, without a timezone. Values are
//! compared as naive date-times.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Pattern used to parse timestamps (fraction of any precision)
const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Pattern used to render timestamps (microsecond precision)
const RENDER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Separator between the timestamp and the content of a stored line
pub const LINE_SEPARATOR: char = '|';

/// A timestamp did not match the expected format
#[derive(Debug, Error)]
#[error("invalid timestamp {input:?}: {source}")]
pub struct TimestampError {
    /// The text that failed to parse
    pub input: String,
    #[source]
    pub source: chrono::ParseError,
}

/// Parses a raw timestamp string
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    NaiveDateTime::parse_from_str(raw, PARSE_FORMAT).map_err(|source| TimestampError {
        input: raw.to_string(),
        source,
    })
}

/// Parses the timestamp prefix of a stored line (`<timestamp> | <content>`)
///
/// Everything before the first `|` is taken as the timestamp. A line without
/// a separator is parsed whole.
pub fn parse_log_line_timestamp(line: &str) -> Result<NaiveDateTime, TimestampError> {
    let prefix = line.split(LINE_SEPARATOR).next().unwrap_or(line);
    parse_timestamp(prefix.trim())
}

/// Renders a timestamp in the stored format
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(RENDER_FORMAT).to_string()
}
