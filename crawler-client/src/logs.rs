//! Log line API operations

use crawler_core::domain::log::LogLine;
use crawler_core::dto::Connection;
use crawler_core::dto::log::LogLineNode;
use serde::{Deserialize, Serialize};

use crate::WandbClient;
use crate::error::{ClientError, Result};
use crate::graphql::RUN_LOG_LINES_QUERY;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunLogLinesVariables<'a> {
    project_name: &'a str,
    entity_name: &'a str,
    run_name: &'a str,
    last: u32,
}

#[derive(Debug, Deserialize)]
struct RunLogLinesData {
    project: Option<ProjectRun>,
}

#[derive(Debug, Deserialize)]
struct ProjectRun {
    run: Option<RunLogLines>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunLogLines {
    log_lines: Option<Connection<LogLineNode>>,
}

impl WandbClient {
    // =============================================================================
    // Log Lines
    // =============================================================================

    /// Fetch up to the `last` most recent log lines of a job
    ///
    /// # Arguments
    /// * `entity` / `project` - Project the job belongs to
    /// * `job_id` - Run name of the job
    /// * `last` - Maximum number of lines to return
    ///
    /// # Returns
    /// The lines in the order the service delivered them
    pub async fn fetch_log_lines(
        &self,
        entity: &str,
        project: &str,
        job_id: &str,
        last: u32,
    ) -> Result<Vec<LogLine>> {
        let variables = RunLogLinesVariables {
            project_name: project,
            entity_name: entity,
            run_name: job_id,
            last,
        };

        let data: RunLogLinesData = self
            .query("RunLogLines", RUN_LOG_LINES_QUERY, variables)
            .await
            .map_err(|e| match e {
                ClientError::ParseError(msg) => {
                    ClientError::ParseError(format!("log lines of job {}: {}", job_id, msg))
                }
                other => other,
            })?;

        extract_lines(data, job_id)
    }
}

fn extract_lines(data: RunLogLinesData, job_id: &str) -> Result<Vec<LogLine>> {
    let run = data
        .project
        .and_then(|project| project.run)
        .ok_or_else(|| ClientError::NotFound(format!("job {}", job_id)))?;

    Ok(run
        .log_lines
        .map(|connection| connection.into_nodes().map(LogLine::from).collect())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: serde_json::Value) -> RunLogLinesData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_lines_keeps_delivered_order() {
        let payload = data(json!({
            "project": {
                "id": "p",
                "run": {
                    "id": "r",
                    "logLines": {
                        "edges": [
                            { "node": { "id": "2", "line": "second", "level": "INFO", "label": null, "timestamp": "2024-01-01T10:00:02.000000", "__typename": "LogLine" } },
                            { "node": { "id": "1", "line": "first", "level": "ERROR", "label": "stderr", "timestamp": "2024-01-01T10:00:01.000000", "__typename": "LogLine" } }
                        ]
                    }
                }
            }
        }));

        let lines = extract_lines(payload, "run-a").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].content, "second");
        assert_eq!(lines[1].timestamp, "2024-01-01T10:00:01.000000");
        assert_eq!(lines[1].label.as_deref(), Some("stderr"));
    }

    #[test]
    fn test_missing_run_names_the_job() {
        let payload = data(json!({ "project": { "id": "p", "run": null } }));
        let err = extract_lines(payload, "run-a").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("run-a"));
    }

    #[test]
    fn test_run_without_lines_is_empty() {
        let payload = data(json!({ "project": { "run": { "logLines": null } } }));
        assert!(extract_lines(payload, "run-a").unwrap().is_empty());
    }
}
