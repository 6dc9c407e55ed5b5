// Report time window: fixed once per run, shared by every metric query.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// `[end - days, end]`.
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    /// Window ending now (UTC).
    pub fn last_days(days: u32) -> Self {
        Self::trailing_days(Utc::now(), days)
    }

    /// RFC 3339 with nanoseconds, as `interval.startTime` expects.
    pub fn start_rfc3339(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    pub fn end_rfc3339(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}
