//! Log domain types

use serde::{Deserialize, Serialize};

use super::timestamp::LINE_SEPARATOR;

/// A log line captured from a running job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Timestamp as delivered by the service (`YYYY-MM-DDTHH:MM:SS.ffffff`)
    pub timestamp: String,
    pub content: String,
    /// Stream level reported by the service, if any
    pub level: Option<String>,
    /// Stream label reported by the service, if any
    pub label: Option<String>,
}

impl LogLine {
    pub fn new(timestamp: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            content: content.into(),
            level: None,
            label: None,
        }
    }
}

/// Severity tags that applications embed in their own log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Success,
    Trace,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Success,
        LogLevel::Trace,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    /// The tag as it appears in log output
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Success => "SUCCESS",
            LogLevel::Trace => "TRACE",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Finds the first level tag contained in `text`
    pub fn find_in(text: &str) -> Option<LogLevel> {
        Self::ALL.into_iter().find(|level| text.contains(level.tag()))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Strips the leading pipe-delimited segment from marked line content
///
/// Content is marked when a level tag anywhere in it is followed (after
/// optional whitespace) by a `|`. For marked content only the text after the
/// first pipe is kept, leading whitespace included, so
/// `2024-05-10 12:00:00.000 | INFO | msg` becomes ` INFO | msg`. Unmarked
/// content is returned unchanged.
pub fn strip_level_marker(content: &str) -> &str {
    if !has_level_marker(content) {
        return content;
    }
    content
        .split_once(LINE_SEPARATOR)
        .map_or(content, |(_, rest)| rest)
}

/// Whether a level tag in `content` is followed by a pipe
fn has_level_marker(content: &str) -> bool {
    LogLevel::ALL.into_iter().any(|level| {
        let tag = level.tag();
        content.match_indices(tag).any(|(pos, _)| {
            content[pos + tag.len()..]
                .trim_start()
                .starts_with(LINE_SEPARATOR)
        })
    })
}
