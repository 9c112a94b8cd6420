use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Sliding-window request budget enforced client-side, ahead of the remote's
/// own throttling. `acquire` blocks until issuing one more request keeps the
/// trailing window under the ceiling. In-process only; a restart forgets it.
#[derive(Debug)]
pub struct RateBudget {
    ceiling: usize,
    interval: Duration,
    issued: Mutex<VecDeque<Instant>>,
}

impl RateBudget {
    pub fn new(ceiling: usize, interval: Duration) -> Self {
        Self {
            ceiling: ceiling.max(1),
            interval,
            issued: Mutex::new(VecDeque::new()),
        }
    }

    /// NVD public budget without an API key: 5 requests per 30 seconds.
    pub fn keyless() -> Self {
        Self::new(5, Duration::from_secs(30))
    }

    /// NVD budget with an API key: 50 requests per 30 seconds.
    pub fn keyed() -> Self {
        Self::new(50, Duration::from_secs(30))
    }

    /// Waits until a request slot is free, then claims it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut issued = self.issued.lock().expect("rate budget lock poisoned");
                let now = Instant::now();
                while let Some(front) = issued.front().copied() {
                    if front + self.interval <= now {
                        issued.pop_front();
                    } else {
                        break;
                    }
                }
                if issued.len() < self.ceiling {
                    issued.push_back(now);
                    return;
                }
                // Oldest in-window request decides when the next slot opens.
                let front = *issued.front().expect("non-empty at ceiling");
                front + self.interval - now
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ceiling_is_respected_in_any_rolling_window() {
        let budget = RateBudget::new(3, Duration::from_secs(30));
        let started = Instant::now();
        let mut grant_times = Vec::new();

        for _ in 0..9 {
            budget.acquire().await;
            grant_times.push(Instant::now() - started);
        }

        // Every rolling 30 s window holds at most 3 grants.
        for (i, t) in grant_times.iter().enumerate() {
            let in_window = grant_times
                .iter()
                .skip(i)
                .take_while(|u| **u < *t + Duration::from_secs(30))
                .count();
            assert!(in_window <= 3, "window starting at grant {i} held {in_window}");
        }

        // The fourth grant had to wait out the full interval.
        assert!(grant_times[3] >= Duration::from_secs(30));
        assert!(grant_times[6] >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn under_budget_acquire_does_not_block() {
        let budget = RateBudget::new(5, Duration::from_secs(30));
        let started = Instant::now();

        for _ in 0..5 {
            budget.acquire().await;
        }

        assert_eq!(Instant::now(), started);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_budget_bounds_concurrent_callers() {
        let budget = Arc::new(RateBudget::new(2, Duration::from_secs(10)));
        let started = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let budget = budget.clone();
            handles.push(tokio::spawn(async move {
                budget.acquire().await;
                Instant::now() - started
            }));
        }

        let mut grants = Vec::new();
        for h in handles {
            grants.push(h.await.expect("task"));
        }
        grants.sort();

        // Three full intervals needed for six requests at two per interval.
        assert!(grants[2] >= Duration::from_secs(10));
        assert!(grants[4] >= Duration::from_secs(20));
    }
}
