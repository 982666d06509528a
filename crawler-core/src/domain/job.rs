//! Job domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration key holding a job's owner key
pub const OWNER_KEY_FIELD: &str = "hotkey";

/// A running job on the tracking service
///
/// Enumerated fresh on every poll; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Short run name, used as the job ID in API queries
    pub id: String,
    pub display_name: Option<String>,
    pub state: JobState,
    /// Decoded run configuration (wrapper objects already unwrapped)
    pub config: HashMap<String, serde_json::Value>,
}

impl Job {
    /// Key used to partition the log store
    ///
    /// Taken from the `hotkey` configuration entry; falls back to the job ID
    /// when the entry is missing or not a scalar.
    pub fn owner_key(&self) -> String {
        match self.config.get(OWNER_KEY_FIELD) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => self.id.clone(),
        }
    }
}

/// Run state as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Finished,
    Crashed,
    Failed,
    Killed,
    Preempted,
    Pending,
    #[serde(other)]
    Unknown,
}

impl JobState {
    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job_with(config: serde_json::Value) -> Job {
        Job {
            id: "abc123".to_string(),
            display_name: None,
            state: JobState::Running,
            config: serde_json::from_value(config).unwrap(),
        }
    }

    #[test]
    fn test_owner_key_from_config() {
        let job = job_with(json!({ "hotkey": "5F3sa2TJ", "lr": 0.1 }));
        assert_eq!(job.owner_key(), "5F3sa2TJ");
    }

    #[test]
    fn test_owner_key_falls_back_to_job_id() {
        assert_eq!(job_with(json!({})).owner_key(), "abc123");
        assert_eq!(job_with(json!({ "hotkey": null })).owner_key(), "abc123");
        assert_eq!(job_with(json!({ "hotkey": "" })).owner_key(), "abc123");
        assert_eq!(job_with(json!({ "hotkey": { "a": 1 } })).owner_key(), "abc123");
    }

    #[test]
    fn test_state_deserializes_unknown_values() {
        let state: JobState = serde_json::from_value(json!("running")).unwrap();
        assert!(state.is_running());
        let state: JobState = serde_json::from_value(json!("zombie")).unwrap();
        assert_eq!(state, JobState::Unknown);
    }
}
