use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Days of imagery gathered before each anchor date.
pub const LOOKBACK_DAYS: u64 = 7;

/// Textual form of window bounds handed to the catalog.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Half-open acquisition window `[anchor - lookback, anchor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub anchor: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window ending at `anchor` and starting `lookback_days` earlier.
    /// Saturates at the earliest representable date.
    pub fn new(anchor: NaiveDate, lookback_days: u64) -> Self {
        let start = anchor.checked_sub_days(Days::new(lookback_days)).unwrap_or(NaiveDate::MIN);
        Self { anchor, start, end: anchor }
    }

    /// Window with the default seven-day lookback.
    pub fn weekly(anchor: NaiveDate) -> Self {
        Self::new(anchor, LOOKBACK_DAYS)
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }

    /// True when `t` falls in `[start 00:00 UTC, end 00:00 UTC)`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        let start = self.start.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = self.end.and_time(chrono::NaiveTime::MIN).and_utc();
        t >= start && t < end
    }
}
