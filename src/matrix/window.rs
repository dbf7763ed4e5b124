//! Reporting window and staleness classification.
//!
//! A result is current when its run started on or after "last night":
//! local midnight of the invocation day in the reference zone, minus a
//! lookback offset. The offset is a policy knob (default 4 hours) so jobs
//! kicked off in the evening still count for today's report.

use chrono::{DateTime, Duration, LocalResult, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::WindowError;

/// Default lookback before local midnight that still counts as current.
pub const DEFAULT_LOOKBACK_HOURS: u32 = 4;

/// Default reference zone.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::US::Eastern;

/// Source of "now". Injected so tests can pin the reporting window.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Current,
    Stale,
}

/// The half-open interval `[start, now)` in the reference zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingWindow {
    pub start: DateTime<Tz>,
    pub now: DateTime<Tz>,
}

impl ReportingWindow {
    /// Compute the window for the instant `now`.
    pub fn at(now: DateTime<Utc>, zone: Tz, lookback: Duration) -> Result<Self, WindowError> {
        let now = now.with_timezone(&zone);
        let start = local_midnight(&now)
            .checked_sub_signed(lookback)
            .ok_or(WindowError::LookbackOutOfRange {
                hours: lookback.num_hours(),
            })?;
        Ok(Self { start, now })
    }

    /// Compute the window from a clock reading.
    pub fn from_clock(clock: &dyn Clock, zone: Tz, lookback: Duration) -> Result<Self, WindowError> {
        Self::at(clock.now(), zone, lookback)
    }

    pub fn zone(&self) -> Tz {
        self.now.timezone()
    }

    pub fn classify(&self, timestamp: DateTime<Utc>) -> Staleness {
        if timestamp.with_timezone(&self.zone()) >= self.start {
            Staleness::Current
        } else {
            Staleness::Stale
        }
    }
}

/// First instant of the local calendar day containing `now`.
///
/// Zones that skip midnight on a DST change start the day at the first
/// local time that exists.
fn local_midnight(now: &DateTime<Tz>) -> DateTime<Tz> {
    let zone = now.timezone();
    let mut naive = now.date_naive().and_time(NaiveTime::MIN);
    loop {
        match zone.from_local_datetime(&naive) {
            LocalResult::Single(t) => return t,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => naive += Duration::minutes(15),
        }
    }
}
