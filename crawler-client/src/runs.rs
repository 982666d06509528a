//! Run-related API operations

use crawler_core::domain::job::Job;
use crawler_core::dto::Connection;
use crawler_core::dto::run::RunNode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::WandbClient;
use crate::error::{ClientError, Result};
use crate::graphql::RUNS_QUERY;

/// Page size requested from the `runs` connection
const RUNS_PER_PAGE: u32 = 50;

/// Upper bound on pages followed in one listing
const MAX_PAGES: usize = 1000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunsVariables<'a> {
    project: &'a str,
    entity: &'a str,
    cursor: Option<String>,
    per_page: u32,
    /// JSON-encoded filter document
    filters: String,
}

#[derive(Debug, Deserialize)]
struct RunsData {
    project: Option<ProjectRuns>,
}

#[derive(Debug, Deserialize)]
struct ProjectRuns {
    runs: Connection<RunNode>,
}

impl WandbClient {
    // =============================================================================
    // Runs
    // =============================================================================

    /// List the running jobs of `<entity>/<project>`
    ///
    /// Follows cursor pagination until the service reports no further pages.
    ///
    /// # Returns
    /// Every running job with its decoded configuration
    pub async fn list_running_jobs(&self, entity: &str, project: &str) -> Result<Vec<Job>> {
        let filters = serde_json::json!({ "state": "running" }).to_string();
        let mut jobs = Vec::new();
        let mut cursor = None;

        for page in 0..MAX_PAGES {
            let variables = RunsVariables {
                project,
                entity,
                cursor: cursor.take(),
                per_page: RUNS_PER_PAGE,
                filters: filters.clone(),
            };

            let data: RunsData = self.query("Runs", RUNS_QUERY, variables).await?;
            let (page_jobs, next) = collect_page(data, entity, project)?;
            debug!("Runs page {} returned {} job(s)", page, page_jobs.len());
            jobs.extend(page_jobs);

            match next {
                Some(next_cursor) => cursor = Some(next_cursor),
                None => return Ok(jobs),
            }
        }

        warn!(
            "Stopped listing runs of {}/{} after {} pages",
            entity, project, MAX_PAGES
        );
        Ok(jobs)
    }
}

/// Converts one page of runs, returning the cursor of the next page if any
fn collect_page(data: RunsData, entity: &str, project: &str) -> Result<(Vec<Job>, Option<String>)> {
    let runs = data
        .project
        .ok_or_else(|| ClientError::NotFound(format!("project {}/{}", entity, project)))?
        .runs;

    let page_info = runs.page_info.clone().unwrap_or_default();
    let mut jobs = Vec::with_capacity(runs.edges.len());

    for node in runs.into_nodes() {
        let fallback = Job {
            id: node.name.clone(),
            display_name: node.display_name.clone(),
            state: node.state.clone(),
            config: HashMap::new(),
        };
        let job = Job::try_from(node).unwrap_or_else(|e| {
            warn!(
                "Ignoring unreadable config of run {}: {}; owner key falls back to the run name",
                fallback.id, e
            );
            fallback
        });

        if job.state.is_running() {
            jobs.push(job);
        } else {
            debug!("Skipping run {} in state {:?}", job.id, job.state);
        }
    }

    let next = if page_info.has_next_page {
        page_info.end_cursor
    } else {
        None
    };

    Ok((jobs, next))
}
