//! Jobs repository
//!
//! Handles communication with the tracking service for job-related operations:
//! - Listing the running jobs of the configured project
//! - Fetching the most recent log lines of a job

use anyhow::{Context, Result};
use async_trait::async_trait;
use crawler_client::{ClientError, WandbClient};
use crawler_core::domain::job::Job;
use crawler_core::domain::log::LogLine;
use tracing::{debug, warn};

/// Repository trait for job-related operations with the tracking service
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Lists the jobs currently in the running state
    async fn list_active_jobs(&self) -> Result<Vec<Job>>;

    /// Fetches the most recent log lines of a job
    ///
    /// Lines are returned in the order the service delivered them.
    ///
    /// # Arguments
    /// * `job_id` - The ID of the job
    async fn fetch_lines(&self, job_id: &str) -> Result<Vec<LogLine>>;
}

/// GraphQL implementation of JobRepository
pub struct GraphqlJobRepository {
    client: WandbClient,
    entity: String,
    project: String,
    max_lines: u32,
}

impl GraphqlJobRepository {
    /// Creates a new GraphQL job repository
    ///
    /// # Arguments
    /// * `client` - Client for the tracking service
    /// * `entity` / `project` - Project whose jobs are crawled
    /// * `max_lines` - Number of most recent lines requested per job
    pub fn new(client: WandbClient, entity: String, project: String, max_lines: u32) -> Self {
        Self {
            client,
            entity,
            project,
            max_lines,
        }
    }
}

#[async_trait]
impl JobRepository for GraphqlJobRepository {
    async fn list_active_jobs(&self) -> Result<Vec<Job>> {
        let jobs = self
            .client
            .list_running_jobs(&self.entity, &self.project)
            .await
            .inspect_err(|e| {
                if let Some(hint) = credentials_hint(e, self.client.is_authenticated()) {
                    warn!("{}", hint);
                }
            })
            .with_context(|| {
                format!(
                    "Failed to list running jobs of {}/{}",
                    self.entity, self.project
                )
            })?;

        Ok(jobs)
    }

    async fn fetch_lines(&self, job_id: &str) -> Result<Vec<LogLine>> {
        let lines = self
            .client
            .fetch_log_lines(&self.entity, &self.project, job_id, self.max_lines)
            .await
            .with_context(|| format!("Failed to get logs for job {}", job_id))?;

        debug!("Fetched {} line(s) for job {}", lines.len(), job_id);
        Ok(lines)
    }
}

/// Hint logged when the service rejects the request's credentials
fn credentials_hint(err: &ClientError, authenticated: bool) -> Option<&'static str> {
    if !err.is_unauthorized() {
        return None;
    }
    Some(if authenticated {
        "The service rejected the API key; check WANDB_API_KEY"
    } else {
        "The project requires authentication; set WANDB_API_KEY"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_hint() {
        let denied = ClientError::api_error(401, "unauthorized");
        assert!(credentials_hint(&denied, true).unwrap().contains("rejected"));
        assert!(credentials_hint(&denied, false).unwrap().contains("set WANDB_API_KEY"));

        let forbidden = ClientError::api_error(403, "forbidden");
        assert!(credentials_hint(&forbidden, true).is_some());

        assert!(credentials_hint(&ClientError::api_error(500, "boom"), false).is_none());
        assert!(credentials_hint(&ClientError::NotFound("project".into()), false).is_none());
    }
}
