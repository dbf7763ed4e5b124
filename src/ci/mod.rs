//! CI server access: the read-only view of build history the aggregator consumes.

pub mod jenkins;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use self::jenkins::JenkinsClient;

/// Build number within a job. Higher is newer.
pub type BuildId = u64;

/// Failure to read build history from the CI server.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// One execution of one matrix configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub description: Option<String>,
    /// Start time. `None` when the server did not report one.
    pub timestamp: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

impl RunRecord {
    pub fn new(description: Option<&str>, timestamp: DateTime<Utc>) -> Self {
        Self {
            description: description.map(str::to_string),
            timestamp: Some(timestamp),
            url: None,
        }
    }
}

/// Read access to a matrix job's build history.
///
/// Builds are fetched one at a time so collection can stop as soon as it
/// has seen enough, without pulling the whole history from the server.
#[async_trait::async_trait]
pub trait RunSource: Send + Sync {
    /// Build numbers of the job, newest first.
    async fn recent_builds(&self) -> Result<Vec<BuildId>, SourceError>;

    /// Runs belonging to one build, in server order.
    async fn build_runs(&self, build: BuildId) -> Result<Vec<RunRecord>, SourceError>;
}
