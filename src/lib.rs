//! matrixwatch -- consolidated status tables for CI matrix builds.
//!
//! This crate polls a CI server for the per-configuration runs of a matrix
//! job, keeps the newest result for every configuration, flags results that
//! predate the reporting window, and renders one table of the whole matrix.

pub mod ci;
pub mod config;
pub mod matrix;

use std::io::Write;

use anyhow::{Context, Result};

use crate::ci::RunSource;
use crate::config::Config;
use crate::matrix::report::{MatrixReport, TableRenderer};
use crate::matrix::{collect_with, Aggregator, Clock, Observation, ReportingWindow};

/// Output options for [`run_report`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub json: bool,
    /// Print one mark per examined run to stderr while collecting.
    pub progress: bool,
}

/// The reporting window for `config` at the clock's current time.
pub fn reporting_window(config: &Config, clock: &dyn Clock) -> Result<ReportingWindow> {
    ReportingWindow::from_clock(clock, config.window.timezone, config.window.lookback())
        .context("invalid reporting window")
}

/// Collect results from `source` and render them.
pub async fn run_report(
    config: &Config,
    clock: &dyn Clock,
    source: &dyn RunSource,
    options: ReportOptions,
) -> Result<String> {
    config.validate()?;
    let expected = config.matrix.expected_cells()?;

    let window = if config.window.mark_outdated {
        let w = reporting_window(config, clock)?;
        tracing::info!(start = %w.start, now = %w.now, "reporting window");
        Some(w)
    } else {
        None
    };

    tracing::info!(job = %config.jenkins.job, expected, "collecting matrix results");
    let aggregator = Aggregator::new(expected, window);
    let collection = collect_with(source, aggregator, |obs| {
        if options.progress {
            let mark = match obs {
                Observation::Recorded(_) => ".",
                Observation::Duplicate | Observation::Unparseable => " ",
            };
            let mut err = std::io::stderr();
            let _ = err.write_all(mark.as_bytes());
            let _ = err.flush();
        }
    })
    .await
    .with_context(|| format!("failed to fetch builds of {}", config.jenkins.job))?;

    if options.progress {
        eprintln!();
    }

    let renderer = TableRenderer {
        column_width: config.report.column_width,
        outdated_marker: config.report.outdated_marker.clone(),
        rows: config.matrix.axis1_ordering(),
        columns: config.matrix.axis2_ordering(),
    };

    if options.json {
        let layout = renderer
            .layout(&collection.table)
            .context("cannot order result table")?;
        let report = MatrixReport::new(
            &config.jenkins.job,
            clock.now(),
            window.map(|w| w.start),
            &collection,
            layout,
        );
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        renderer
            .render(&collection.table)
            .context("cannot order result table")
    }
}
