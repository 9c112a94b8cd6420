use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

/// A half-open `[start, end)` modification-time range queried as one logical
/// scan. Adjacent windows share a boundary instant, so concatenated windows
/// tile a range with no gap and no overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_half_open() {
        let start = Utc::now();
        let end = start + Duration::hours(1);
        let w = TimeWindow::new(start, end);

        assert!(w.contains(start));
        assert!(!w.contains(end));
        assert_eq!(w.duration(), Duration::hours(1));
    }
}
