//! GraphQL request/response envelopes and query documents

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Lists runs of a project matching a filter, one page at a time
pub(crate) const RUNS_QUERY: &str = r#"
query Runs($project: String!, $entity: String!, $cursor: String, $perPage: Int = 50, $filters: JSONString) {
  project(name: $project, entityName: $entity) {
    runs(filters: $filters, after: $cursor, first: $perPage) {
      edges {
        node {
          id
          name
          displayName
          state
          config
        }
        cursor
      }
      pageInfo {
        endCursor
        hasNextPage
      }
    }
  }
}
"#;

/// Fetches the most recent log lines of a run
pub(crate) const RUN_LOG_LINES_QUERY: &str = r#"
query RunLogLines($projectName: String!, $entityName: String, $runName: String!, $last: Int!) {
  project(name: $projectName, entityName: $entityName) {
    id
    run(name: $runName) {
      id
      logLines(last: $last) {
        edges {
          node {
            id
            line
            level
            label
            timestamp
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphQlRequest<'a, V> {
    pub operation_name: &'a str,
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlErrorMessage>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlErrorMessage {
    pub message: String,
}

impl<T> GraphQlResponse<T> {
    /// Returns the payload, or the errors the server reported instead
    pub fn into_data(self) -> Result<T> {
        let errors = self.errors.unwrap_or_default();
        if !errors.is_empty() {
            return Err(ClientError::GraphQl(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        self.data
            .ok_or_else(|| ClientError::ParseError("response has no data".to_string()))
    }
}
