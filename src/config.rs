//! TOML configuration for matrixwatch.
//!
//! Layered the same way on every run: an explicit `--config` path, then the
//! `MATRIXWATCH_CONFIG` environment variable, then `./matrixwatch.toml`,
//! then compiled-in defaults. CLI flags are applied on top by the binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ci::jenkins::JenkinsSettings;
use crate::matrix::report::{DEFAULT_COLUMN_WIDTH, DEFAULT_OUTDATED_MARKER};
use crate::matrix::window::{DEFAULT_LOOKBACK_HOURS, DEFAULT_TIMEZONE};
use crate::matrix::AxisOrder;

pub const CONFIG_ENV: &str = "MATRIXWATCH_CONFIG";
pub const LOCAL_CONFIG: &str = "matrixwatch.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for a matrixwatch run, one field per TOML section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub jenkins: JenkinsConfig,
    #[serde(default)]
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the configuration file to use.
    ///
    /// An explicitly requested file must load. Files found through the
    /// environment or the working directory fall back to defaults with a
    /// warning when they are unreadable.
    pub fn load_layered(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            match Self::load(&path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "{} set but file could not be loaded, trying fallback", CONFIG_ENV
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.jenkins.url.trim().is_empty() {
            bail!("jenkins.url must not be empty");
        }
        if self.jenkins.job.trim().is_empty() {
            bail!("jenkins.job must not be empty");
        }
        if self.report.column_width == 0 {
            bail!("report.column_width must be at least 1");
        }
        self.matrix.expected_cells()?;
        Ok(())
    }

    /// Copy with the API token hidden, for display.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.jenkins.api_token.is_some() {
            cfg.jenkins.api_token = Some("<redacted>".to_string());
        }
        cfg
    }

    pub fn jenkins_settings(&self) -> JenkinsSettings {
        JenkinsSettings {
            url: self.jenkins.url.clone(),
            job: self.jenkins.job.clone(),
            username: self.jenkins.username.clone(),
            api_token: self.jenkins.api_token.clone(),
            timeout: Duration::from_secs(self.jenkins.timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Jenkins
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JenkinsConfig {
    /// Base URL of the Jenkins server.
    pub url: String,
    /// Matrix job name. Folders are separated with `/`.
    pub job: String,
    pub username: Option<String>,
    /// API token, sent as the basic-auth password.
    pub api_token: Option<String>,
    /// Per-request timeout (seconds).
    pub timeout_secs: u64,
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            job: "Test_Tower_Integration".to_string(),
            username: None,
            api_token: None,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Matrix
// ---------------------------------------------------------------------------

/// Shape of the configuration matrix and the display order of its axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub axis1_name: String,
    pub axis2_name: String,
    /// Number of axis-1 values. Defaults to the size of `axis1_order`.
    pub axis1_count: Option<usize>,
    /// Number of axis-2 values. Defaults to the size of `axis2_order`.
    pub axis2_count: Option<usize>,
    /// Row order: value -> weight, lowest first.
    pub axis1_order: Option<BTreeMap<String, i64>>,
    /// Column order: value -> weight, lowest first.
    pub axis2_order: Option<BTreeMap<String, i64>>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            axis1_name: "platform".to_string(),
            axis2_name: "version".to_string(),
            axis1_count: None,
            axis2_count: None,
            axis1_order: None,
            axis2_order: None,
        }
    }
}

impl MatrixConfig {
    fn axis_count(
        name: &str,
        count: Option<usize>,
        order: Option<&BTreeMap<String, i64>>,
    ) -> Result<usize> {
        match (count, order) {
            (Some(n), _) => Ok(n),
            (None, Some(order)) => Ok(order.len()),
            (None, None) => bail!(
                "number of {} values is unknown: set matrix count or order for {}",
                name,
                name
            ),
        }
    }

    /// Number of cells a complete build reports.
    pub fn expected_cells(&self) -> Result<usize> {
        let rows = Self::axis_count(&self.axis1_name, self.axis1_count, self.axis1_order.as_ref())?;
        let cols = Self::axis_count(&self.axis2_name, self.axis2_count, self.axis2_order.as_ref())?;
        Ok(rows * cols)
    }

    pub fn axis1_ordering(&self) -> AxisOrder {
        AxisOrder::from_weights(&self.axis1_name, self.axis1_order.as_ref())
    }

    pub fn axis2_ordering(&self) -> AxisOrder {
        AxisOrder::from_weights(&self.axis2_name, self.axis2_order.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// IANA zone whose calendar day defines "today".
    pub timezone: Tz,
    /// Hours before local midnight that still count as current. Policy, not
    /// a derived value.
    pub lookback_hours: u32,
    /// When false every result is shown as-is, however old.
    pub mark_outdated: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            mark_outdated: true,
        }
    }
}

impl WindowConfig {
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.lookback_hours))
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub column_width: usize,
    /// Cell text for results older than the reporting window.
    pub outdated_marker: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            column_width: DEFAULT_COLUMN_WIDTH,
            outdated_marker: DEFAULT_OUTDATED_MARKER.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = Config::default();

        assert_eq!(cfg.jenkins.url, "http://localhost:8080");
        assert_eq!(cfg.jenkins.timeout_secs, 30);
        assert!(cfg.jenkins.api_token.is_none());

        assert_eq!(cfg.window.timezone, chrono_tz::US::Eastern);
        assert_eq!(cfg.window.lookback_hours, 4);
        assert!(cfg.window.mark_outdated);

        assert_eq!(cfg.report.column_width, 23);
        assert_eq!(cfg.report.outdated_marker, "<outdated>");

        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_load_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[jenkins]
url = "http://jenkins.company.com"
job = "Test_Tower_Integration"
username = "user@email.com"
api_token = "secret"

[matrix]
axis1_count = 8
axis2_order = {{ "devel" = 0, "stable-2.1" = 1, "stable-1.9" = 2 }}

[window]
timezone = "Europe/Berlin"
lookback_hours = 6

[report]
column_width = 30
"#
        )
        .unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.jenkins.username.as_deref(), Some("user@email.com"));
        assert_eq!(cfg.window.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(cfg.window.lookback(), chrono::Duration::hours(6));
        assert_eq!(cfg.report.column_width, 30);
        // Unset sections keep their defaults.
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.matrix.expected_cells().unwrap(), 24);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load_layered(Some(&missing)).is_err());
    }

    #[test]
    fn test_bad_timezone_rejected() {
        let err = toml::from_str::<Config>("[window]\ntimezone = \"Mars/Olympus\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_expected_cells_requires_axis_size() {
        let cfg = Config::default();
        assert!(cfg.matrix.expected_cells().is_err());
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.matrix.axis1_count = Some(3);
        cfg.matrix.axis2_count = Some(2);
        assert_eq!(cfg.matrix.expected_cells().unwrap(), 6);

        cfg.matrix.axis2_count = Some(0);
        assert_eq!(cfg.matrix.expected_cells().unwrap(), 0);
    }

    #[test]
    fn test_orderings_follow_config() {
        let mut matrix = MatrixConfig::default();
        assert_eq!(matrix.axis1_ordering(), AxisOrder::Lexicographic);

        matrix.axis2_order = Some([("devel".to_string(), 0)].into_iter().collect());
        assert_eq!(
            matrix.axis2_ordering().sort(["devel"]).unwrap(),
            vec!["devel".to_string()]
        );
    }

    #[test]
    fn test_redacted_hides_token() {
        let mut cfg = Config::default();
        cfg.jenkins.api_token = Some("secret".to_string());
        let shown = toml::to_string(&cfg.redacted()).unwrap();
        assert!(!shown.contains("secret"));
        assert!(shown.contains("<redacted>"));
    }
}
