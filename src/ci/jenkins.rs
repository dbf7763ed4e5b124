//! Jenkins JSON API client for matrix (multi-configuration) jobs.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{BuildId, RunRecord, RunSource, SourceError};

#[derive(Debug, Deserialize)]
struct JobResponse {
    #[serde(default)]
    builds: Vec<BuildRef>,
}

#[derive(Debug, Deserialize)]
struct BuildRef {
    number: BuildId,
}

#[derive(Debug, Deserialize)]
struct MatrixBuildResponse {
    #[serde(default)]
    runs: Vec<RunResponse>,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    number: BuildId,
    description: Option<String>,
    timestamp: Option<i64>, // ms since epoch
    url: Option<String>,
}

/// Connection settings for [`JenkinsClient`].
#[derive(Debug, Clone)]
pub struct JenkinsSettings {
    pub url: String,
    pub job: String,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

/// [`RunSource`] backed by the Jenkins JSON API of one matrix job.
pub struct JenkinsClient {
    client: Client,
    settings: JenkinsSettings,
}

impl JenkinsClient {
    pub fn new(settings: JenkinsSettings) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|source| SourceError::Http {
                url: settings.url.clone(),
                source,
            })?;
        Ok(Self { client, settings })
    }

    /// `{url}/job/a/job/b` for a job named `a/b`.
    fn job_url(&self) -> String {
        let base = self.settings.url.trim_end_matches('/');
        let path: Vec<String> = self
            .settings
            .job
            .split('/')
            .filter(|seg| !seg.is_empty())
            .map(|seg| format!("job/{}", seg))
            .collect();
        format!("{}/{}", base, path.join("/"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, SourceError> {
        tracing::debug!(%url, "GET");
        let mut req = self.client.get(&url);
        if let Some(user) = &self.settings.username {
            req = req.basic_auth(user, self.settings.api_token.as_deref());
        }

        let resp = req.send().await.map_err(|source| SourceError::Http {
            url: url.clone(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|source| SourceError::Http {
            url: url.clone(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|e| SourceError::Decode {
            url,
            reason: e.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl RunSource for JenkinsClient {
    async fn recent_builds(&self) -> Result<Vec<BuildId>, SourceError> {
        let url = format!("{}/api/json?tree=builds[number]", self.job_url());
        let job: JobResponse = self.get_json(url).await?;
        Ok(build_ids(job))
    }

    async fn build_runs(&self, build: BuildId) -> Result<Vec<RunRecord>, SourceError> {
        let url = format!(
            "{}/{}/api/json?tree=runs[number,description,timestamp,url]",
            self.job_url(),
            build
        );
        let resp: MatrixBuildResponse = self.get_json(url.clone()).await?;
        Ok(runs_of_build(resp, build))
    }
}

fn build_ids(job: JobResponse) -> Vec<BuildId> {
    let mut ids: Vec<BuildId> = job.builds.into_iter().map(|b| b.number).collect();
    ids.sort_unstable_by(|a, b| b.cmp(a));
    ids.dedup();
    ids
}

/// A matrix build lists the latest run of every configuration, which may
/// come from another build when a configuration did not run this time.
/// Keep only the runs that actually belong to `build`.
fn runs_of_build(resp: MatrixBuildResponse, build: BuildId) -> Vec<RunRecord> {
    resp.runs
        .into_iter()
        .filter(|r| r.number == build)
        .map(|run| {
            let timestamp = run
                .timestamp
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
            if timestamp.is_none() {
                tracing::warn!(url = ?run.url, "run has no valid timestamp");
            }
            RunRecord {
                description: run.description,
                timestamp,
                url: run.url,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str, job: &str) -> JenkinsClient {
        JenkinsClient::new(JenkinsSettings {
            url: url.to_string(),
            job: job.to_string(),
            username: None,
            api_token: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_job_url() {
        assert_eq!(
            client("http://jenkins.example.com/", "Test_Tower_Integration").job_url(),
            "http://jenkins.example.com/job/Test_Tower_Integration"
        );
        assert_eq!(
            client("http://ci:8080", "tower/nightly").job_url(),
            "http://ci:8080/job/tower/job/nightly"
        );
    }

    #[test]
    fn test_build_ids_newest_first() {
        let job: JobResponse =
            serde_json::from_str(r#"{"builds":[{"number":41},{"number":43},{"number":42}]}"#).unwrap();
        assert_eq!(build_ids(job), vec![43, 42, 41]);
    }

    #[test]
    fn test_runs_filtered_to_build() {
        let resp: MatrixBuildResponse = serde_json::from_str(
            r#"{"runs":[
                {"number":43,"description":"rhel-7.2-x86_64 / devel (passed)","timestamp":1760745600000,"url":"u1"},
                {"number":41,"description":"ol-7.2-x86_64 / devel (failed)","timestamp":1760572800000,"url":"u2"},
                {"number":43,"description":null,"timestamp":1760745601000,"url":"u3"}
            ]}"#,
        )
        .unwrap();

        let runs = runs_of_build(resp, 43);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].description.as_deref(), Some("rhel-7.2-x86_64 / devel (passed)"));
        assert_eq!(
            runs[0].timestamp.map(|t| t.to_rfc3339()).as_deref(),
            Some("2025-10-18T00:00:00+00:00")
        );
        assert_eq!(runs[1].description, None);
    }

    #[test]
    fn test_run_without_timestamp_is_kept_without_time() {
        let resp: MatrixBuildResponse = serde_json::from_str(
            r#"{"runs":[
                {"number":7,"description":"a / b (c)"},
                {"number":7,"description":"d / b (c)","timestamp":1760745600000}
            ]}"#,
        )
        .unwrap();
        let runs = runs_of_build(resp, 7);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].description.as_deref(), Some("a / b (c)"));
        assert_eq!(runs[0].timestamp, None);
        assert!(runs[1].timestamp.is_some());
    }
}
