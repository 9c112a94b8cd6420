use chrono::{DateTime, Duration, Utc};
use model::{sync::SyncMode, window::TimeWindow};

/// Finite sequence of `[start, end)` windows covering a sync scan.
///
/// Recomputed fresh from the checkpoint on every invocation, never resumed
/// mid-sequence: after an aborted run the next plan simply starts at the
/// last durable checkpoint again. Consecutive windows chain exactly (the
/// end of window `n` is the start of window `n + 1`), so the covered range
/// has no gap and no duplicated instant.
#[derive(Debug, Clone)]
pub struct WindowPlan {
    cursor: DateTime<Utc>,
    end: DateTime<Utc>,
    span: Duration,
}

impl WindowPlan {
    /// Plans the scan for one entity type.
    ///
    /// Full mode scans from the Unix epoch; incremental mode from the
    /// checkpoint, degrading to full when none exists yet. Both end at
    /// `now - safety_delay` so data still being committed at the source is
    /// not queried. Yields nothing when that end is not past the start,
    /// which simply means "nothing new yet".
    pub fn new(
        mode: SyncMode,
        checkpoint: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        safety_delay: Duration,
        max_span: Duration,
    ) -> Self {
        let start = match (mode, checkpoint) {
            (SyncMode::Incremental, Some(cp)) => cp,
            _ => DateTime::UNIX_EPOCH,
        };
        Self {
            cursor: start,
            end: now - safety_delay,
            span: max_span.max(Duration::seconds(1)),
        }
    }
}

impl Iterator for WindowPlan {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<TimeWindow> {
        if self.cursor >= self.end {
            return None;
        }
        let end = (self.cursor + self.span).min(self.end);
        let window = TimeWindow::new(self.cursor, end);
        self.cursor = end;
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn full_scan_windows_tile_the_range() {
        let now = ts(2026, 3, 1);
        let delay = Duration::minutes(5);
        let span = Duration::days(120);
        let windows: Vec<_> =
            WindowPlan::new(SyncMode::Full, None, now, delay, span).collect();

        assert!(!windows.is_empty());
        assert_eq!(windows[0].start, DateTime::UNIX_EPOCH);
        assert_eq!(windows.last().unwrap().end, now - delay);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for w in &windows {
            assert!(w.duration() <= span);
            assert!(w.start < w.end);
        }
    }

    #[test]
    fn incremental_starts_at_checkpoint() {
        let cp = ts(2026, 1, 1);
        let now = ts(2026, 2, 1);
        let windows: Vec<_> = WindowPlan::new(
            SyncMode::Incremental,
            Some(cp),
            now,
            Duration::minutes(5),
            Duration::days(120),
        )
        .collect();

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, cp);
        assert_eq!(windows[0].end, now - Duration::minutes(5));
    }

    #[test]
    fn incremental_without_checkpoint_degrades_to_full() {
        let now = ts(2026, 2, 1);
        let mut plan = WindowPlan::new(
            SyncMode::Incremental,
            None,
            now,
            Duration::minutes(5),
            Duration::days(120),
        );

        assert_eq!(plan.next().unwrap().start, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn nothing_new_yields_no_windows() {
        let now = ts(2026, 2, 1);
        // Safety delay pushes the end before the checkpoint.
        let mut plan = WindowPlan::new(
            SyncMode::Incremental,
            Some(now),
            now,
            Duration::minutes(5),
            Duration::days(120),
        );

        assert!(plan.next().is_none());
    }

    #[test]
    fn span_wider_than_range_yields_single_window() {
        let cp = ts(2026, 1, 20);
        let now = ts(2026, 1, 25);
        let windows: Vec<_> = WindowPlan::new(
            SyncMode::Incremental,
            Some(cp),
            now,
            Duration::zero(),
            Duration::days(120),
        )
        .collect();

        assert_eq!(windows, vec![TimeWindow::new(cp, now)]);
    }
}
