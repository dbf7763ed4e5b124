use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use matrixwatch::ci::JenkinsClient;
use matrixwatch::config::{Config, LogFormat};
use matrixwatch::matrix::SystemClock;
use matrixwatch::ReportOptions;

#[derive(Parser)]
#[command(
    name = "matrixwatch",
    about = "Consolidated status tables for CI matrix builds",
    version,
    long_about = None
)]
struct Cli {
    /// Configuration file (default: $MATRIXWATCH_CONFIG, then ./matrixwatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Values that take precedence over the configuration file.
#[derive(Args)]
struct Overrides {
    /// Jenkins base URL
    #[arg(long, global = true, env = "MATRIXWATCH_URL")]
    url: Option<String>,

    /// Matrix job name
    #[arg(long, global = true, env = "MATRIXWATCH_JOB")]
    job: Option<String>,

    /// Jenkins user name
    #[arg(long, global = true, env = "MATRIXWATCH_USERNAME")]
    username: Option<String>,

    /// Jenkins API token
    #[arg(long, global = true, env = "MATRIXWATCH_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Reference time zone for the reporting window (IANA name)
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Hours before local midnight that still count as current
    #[arg(long, global = true)]
    lookback_hours: Option<u32>,

    /// Table column width
    #[arg(long, global = true)]
    column_width: Option<usize>,
}

impl Overrides {
    fn apply(self, cfg: &mut Config) -> Result<()> {
        if let Some(v) = self.url {
            cfg.jenkins.url = v;
        }
        if let Some(v) = self.job {
            cfg.jenkins.job = v;
        }
        if self.username.is_some() {
            cfg.jenkins.username = self.username;
        }
        if self.api_token.is_some() {
            cfg.jenkins.api_token = self.api_token;
        }
        if let Some(v) = self.timezone {
            cfg.window.timezone = v
                .parse::<chrono_tz::Tz>()
                .map_err(|_| anyhow::anyhow!("unknown time zone: {}", v))?;
        }
        if let Some(v) = self.lookback_hours {
            cfg.window.lookback_hours = v;
        }
        if let Some(v) = self.column_width {
            cfg.report.column_width = v;
        }
        Ok(())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Collect the latest matrix results and print the status table
    Report {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,

        /// Show collection progress on stderr
        #[arg(long)]
        progress: bool,
    },

    /// Show the current reporting window
    Window,

    /// Print the effective configuration (API token redacted)
    ShowConfig,
}

fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cfg.logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The configured log level is not known until the file is read; log
    // the load itself through a default stderr subscriber.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    let mut cfg = tracing::subscriber::with_default(bootstrap, || {
        Config::load_layered(cli.config.as_deref())
    })?;
    cli.overrides.apply(&mut cfg)?;
    init_tracing(&cfg);

    match cli.command {
        Commands::Report { json, progress } => {
            let client = JenkinsClient::new(cfg.jenkins_settings())?;
            let output = matrixwatch::run_report(
                &cfg,
                &SystemClock,
                &client,
                ReportOptions { json, progress },
            )
            .await?;
            print!("{}", output);
            if json {
                println!();
            }
        }
        Commands::Window => {
            let window = matrixwatch::reporting_window(&cfg, &SystemClock)?;
            println!("Zone:  {}", window.zone());
            println!("Start: {}", window.start.format("%Y-%m-%d %H:%M:%S %Z"));
            println!("Now:   {}", window.now.format("%Y-%m-%d %H:%M:%S %Z"));
            if !cfg.window.mark_outdated {
                println!("(outdated marking disabled)");
            }
        }
        Commands::ShowConfig => {
            print!("{}", toml::to_string_pretty(&cfg.redacted())?);
        }
    }

    Ok(())
}
