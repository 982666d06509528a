//! Run DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::job::{Job, JobState};

/// A `runs` node as returned by the `Runs` query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunNode {
    /// Opaque internal identifier
    pub id: String,
    /// Short run name used to address the run in other queries
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub state: JobState,
    /// JSON-encoded configuration object
    #[serde(default)]
    pub config: Option<String>,
}

impl TryFrom<RunNode> for Job {
    type Error = serde_json::Error;

    fn try_from(node: RunNode) -> Result<Self, Self::Error> {
        let config = match node.config.as_deref().map(str::trim) {
            None | Some("") | Some("null") => HashMap::new(),
            Some(raw) => decode_config(raw)?,
        };

        Ok(Job {
            id: node.name,
            display_name: node.display_name,
            state: node.state,
            config,
        })
    }
}

/// Decodes a run configuration string
///
/// Entries are stored as `{"value": ..., "desc": ...}` wrappers; the value is
/// unwrapped. Bare values are kept as-is and `_`-prefixed internal keys are
/// dropped.
fn decode_config(raw: &str) -> Result<HashMap<String, serde_json::Value>, serde_json::Error> {
    let entries: HashMap<String, serde_json::Value> = serde_json::from_str(raw)?;

    Ok(entries
        .into_iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .map(|(key, entry)| {
            let value = match entry {
                serde_json::Value::Object(mut wrapper) if wrapper.contains_key("value") => {
                    wrapper.remove("value").unwrap_or(serde_json::Value::Null)
                }
                other => other,
            };
            (key, value)
        })
        .collect())
}
