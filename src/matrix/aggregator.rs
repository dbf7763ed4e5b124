//! Build-by-build result collection.
//!
//! Builds are consumed newest first. The first successful parse for a
//! configuration wins; later (older) runs of the same configuration are
//! dropped. Collection stops after a build once every expected cell has a
//! result, or once more than twice the expected cell count of runs has been
//! examined. The second bound keeps a job with permanently missing
//! configurations from walking the server's entire history.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::parser::DescriptionParser;
use super::window::{ReportingWindow, Staleness};
use super::{ParseError, ResultEntry, ResultTable};
use crate::ci::{RunRecord, RunSource, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Collecting,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No cells were expected, so nothing was fetched.
    NothingExpected,
    /// Every expected cell received a result.
    AllCellsReported,
    /// The scan bound was exceeded before every cell reported.
    ScanBoundExceeded,
    /// The build history ran out first.
    HistoryExhausted,
}

/// What happened to a single run record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// A new result was stored for the run's configuration.
    Recorded(Staleness),
    /// A newer run already supplied this configuration.
    Duplicate,
    /// The description was missing or malformed.
    Unparseable,
}

/// Result of a finished collection.
#[derive(Debug, Clone)]
pub struct Collection {
    pub table: ResultTable,
    pub stop: StopReason,
    pub expected_cells: usize,
    pub builds_scanned: usize,
    pub records_examined: usize,
    pub new_results: usize,
}

impl Collection {
    pub fn is_complete(&self) -> bool {
        self.new_results >= self.expected_cells
    }
}

/// Folds run records, newest build first, into a [`ResultTable`].
///
/// Starts `Collecting` and moves to `Done` once a stop condition holds after
/// a build; it never goes back.
pub struct Aggregator {
    parser: DescriptionParser,
    window: Option<ReportingWindow>,
    expected_cells: usize,
    table: ResultTable,
    new_results: usize,
    records_examined: usize,
    builds_scanned: usize,
    state: AggregatorState,
    stop: Option<StopReason>,
}

impl Aggregator {
    /// `window` of `None` treats every parsed result as current.
    pub fn new(expected_cells: usize, window: Option<ReportingWindow>) -> Self {
        let (state, stop) = if expected_cells == 0 {
            (AggregatorState::Done, Some(StopReason::NothingExpected))
        } else {
            (AggregatorState::Collecting, None)
        };

        Self {
            parser: DescriptionParser::new(),
            window,
            expected_cells,
            table: ResultTable::new(),
            new_results: 0,
            records_examined: 0,
            builds_scanned: 0,
            state,
            stop,
        }
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == AggregatorState::Done
    }

    pub fn new_results(&self) -> usize {
        self.new_results
    }

    pub fn records_examined(&self) -> usize {
        self.records_examined
    }

    pub fn table(&self) -> &ResultTable {
        &self.table
    }

    /// Maximum runs examined before giving up on missing cells.
    pub fn scan_bound(&self) -> usize {
        self.expected_cells * 2
    }

    /// Feed the runs of one build, in source order.
    ///
    /// # Panics
    ///
    /// Panics if the aggregator is already `Done`.
    pub fn observe(&mut self, runs: &[RunRecord]) -> Vec<Observation> {
        assert_eq!(
            self.state,
            AggregatorState::Collecting,
            "observe called after aggregation finished"
        );

        let observations: Vec<Observation> = runs.iter().map(|run| self.observe_run(run)).collect();
        self.builds_scanned += 1;

        if self.new_results >= self.expected_cells {
            self.finish_with(StopReason::AllCellsReported);
        } else if self.records_examined > self.scan_bound() {
            self.finish_with(StopReason::ScanBoundExceeded);
        }

        observations
    }

    fn observe_run(&mut self, run: &RunRecord) -> Observation {
        self.records_examined += 1;

        let parsed = match self.parser.parse(run.description.as_deref()) {
            Ok(p) => p,
            Err(ParseError::MissingDescription) => {
                debug!(url = ?run.url, "run has no description");
                return Observation::Unparseable;
            }
            Err(e) => {
                warn!(url = ?run.url, error = %e, "skipping run");
                return Observation::Unparseable;
            }
        };

        // A run with no start time cannot be placed inside the window.
        let staleness = match (&self.window, run.timestamp) {
            (None, _) => Staleness::Current,
            (Some(w), Some(ts)) => w.classify(ts),
            (Some(_), None) => Staleness::Stale,
        };
        let entry = match staleness {
            Staleness::Current => ResultEntry::Status(parsed.outcome),
            Staleness::Stale => ResultEntry::Outdated,
        };

        if !self.table.try_insert(parsed.key.clone(), entry) {
            return Observation::Duplicate;
        }

        debug!(key = %parsed.key, ?staleness, timestamp = ?run.timestamp, "recorded result");
        self.new_results += 1;
        Observation::Recorded(staleness)
    }

    fn finish_with(&mut self, reason: StopReason) {
        info!(
            ?reason,
            new_results = self.new_results,
            expected = self.expected_cells,
            examined = self.records_examined,
            builds = self.builds_scanned,
            "collection finished"
        );
        self.state = AggregatorState::Done;
        self.stop = Some(reason);
    }

    /// Hand off the table. An aggregator still collecting ran out of history.
    pub fn finish(self) -> Collection {
        let stop = match self.stop {
            Some(reason) => reason,
            None => {
                warn!(
                    new_results = self.new_results,
                    expected = self.expected_cells,
                    "build history exhausted before every configuration reported"
                );
                StopReason::HistoryExhausted
            }
        };

        Collection {
            table: self.table,
            stop,
            expected_cells: self.expected_cells,
            builds_scanned: self.builds_scanned,
            records_examined: self.records_examined,
            new_results: self.new_results,
        }
    }
}

/// Drive `aggregator` over `source` until it is done or history runs out.
pub async fn collect<S>(source: &S, aggregator: Aggregator) -> Result<Collection, SourceError>
where
    S: RunSource + ?Sized,
{
    collect_with(source, aggregator, |_| {}).await
}

/// Like [`collect`], reporting every per-run decision to `on_observation`.
pub async fn collect_with<S, F>(
    source: &S,
    mut aggregator: Aggregator,
    mut on_observation: F,
) -> Result<Collection, SourceError>
where
    S: RunSource + ?Sized,
    F: FnMut(Observation),
{
    if aggregator.is_done() {
        return Ok(aggregator.finish());
    }

    let builds = source.recent_builds().await?;
    debug!(count = builds.len(), "listed builds");

    for build in builds {
        let runs = source.build_runs(build).await?;
        debug!(build, runs = runs.len(), "fetched build");

        let span = tracing::debug_span!("build", id = build);
        let observations = {
            let _enter = span.enter();
            aggregator.observe(&runs)
        };
        observations.into_iter().for_each(&mut on_observation);

        if aggregator.is_done() {
            break;
        }
    }

    Ok(aggregator.finish())
}
