//! Log line DTOs

use serde::{Deserialize, Serialize};

use crate::domain::log::LogLine;

/// A `logLines` node as returned by the `RunLogLines` query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLineNode {
    #[serde(default)]
    pub id: Option<String>,
    pub line: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    pub timestamp: String,
}

impl From<LogLineNode> for LogLine {
    fn from(node: LogLineNode) -> Self {
        Self {
            timestamp: node.timestamp,
            content: node.line,
            level: node.level,
            label: node.label,
        }
    }
}
