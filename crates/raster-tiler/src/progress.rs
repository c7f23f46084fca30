//! Progress reporting for a generation run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

/// Callback receiving the completed percentage (0.0 - 100.0).
pub type ProgressReceiver = Arc<dyn Fn(f64) + Send + Sync>;

/// Counts visited tiles and forwards the percentage to a receiver.
pub struct ProgressTracker {
    total: u64,
    completed: AtomicU64,
    receiver: Option<ProgressReceiver>,
    started: Instant,
    print_eta: bool,
    last_logged: AtomicU64,
}

impl ProgressTracker {
    pub fn new(total: u64, receiver: Option<ProgressReceiver>, print_eta: bool) -> Self {
        Self {
            total,
            completed: AtomicU64::new(0),
            receiver,
            started: Instant::now(),
            print_eta,
            last_logged: AtomicU64::new(0),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Percentage of visited tiles; an empty run counts as complete.
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed() as f64 / self.total as f64 * 100.0).min(100.0)
    }

    /// Mark one more tile as visited.
    pub fn tick(&self) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        let percent = if self.total == 0 {
            100.0
        } else {
            (done as f64 / self.total as f64 * 100.0).min(100.0)
        };

        if let Some(receiver) = &self.receiver {
            receiver(percent);
        }

        if self.print_eta {
            let whole = percent.floor() as u64;
            if self.last_logged.fetch_max(whole, Ordering::Relaxed) < whole {
                let remaining = estimate_remaining(self.started.elapsed(), percent);
                info!(
                    percent = whole,
                    done,
                    total = self.total,
                    eta_secs = remaining.map(|d| d.as_secs()),
                    "Generation progress"
                );
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total", &self.total)
            .field("completed", &self.completed())
            .field("print_eta", &self.print_eta)
            .finish_non_exhaustive()
    }
}

/// Linear estimate of the time left, given the time spent on `percent`.
pub fn estimate_remaining(elapsed: Duration, percent: f64) -> Option<Duration> {
    if percent.is_nan() || percent <= 0.0 {
        return None;
    }
    if percent >= 100.0 {
        return Some(Duration::ZERO);
    }
    let remaining = elapsed.as_secs_f64() * (100.0 - percent) / percent;
    Some(Duration::from_secs_f64(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_receiver_sees_each_tick() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let receiver: ProgressReceiver = Arc::new(move |p| sink.lock().unwrap().push(p));

        let tracker = ProgressTracker::new(4, Some(receiver), true);
        for _ in 0..4 {
            tracker.tick();
        }

        assert_eq!(*seen.lock().unwrap(), vec![25.0, 50.0, 75.0, 100.0]);
        assert_eq!(tracker.completed(), 4);
        assert_eq!(tracker.percent_complete(), 100.0);
    }

    #[test]
    fn test_empty_run_is_complete() {
        let tracker = ProgressTracker::new(0, None, false);
        assert_eq!(tracker.percent_complete(), 100.0);
    }

    #[test]
    fn test_estimate_remaining() {
        assert_eq!(estimate_remaining(Duration::from_secs(10), 0.0), None);
        assert_eq!(
            estimate_remaining(Duration::from_secs(10), 25.0),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            estimate_remaining(Duration::from_secs(10), 100.0),
            Some(Duration::ZERO)
        );
    }
}
