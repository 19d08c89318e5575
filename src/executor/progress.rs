//! Progress reporting for bounded runs

use std::fmt;
use std::time::Duration;

/// Snapshot passed to the progress callback after each successful task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Tasks completed successfully so far
    pub completed: usize,

    /// Total tasks in the run
    pub total: usize,

    /// Time since the run started
    pub elapsed: Duration,
}

impl Progress {
    /// Create a progress snapshot
    pub fn new(completed: usize, total: usize, elapsed: Duration) -> Self {
        Self {
            completed,
            total,
            elapsed,
        }
    }

    /// Completion percentage in the range 0-100
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }

    /// Tasks not yet completed
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    /// Whether every task has completed
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Estimated time to finish, from the mean time per completed task
    pub fn eta(&self) -> Option<Duration> {
        if self.completed == 0 {
            return None;
        }
        let nanos = self.elapsed.as_nanos() * self.remaining() as u128 / self.completed as u128;
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Completed {} of {} tasks ({:.1}%) in {}ms",
            self.completed,
            self.total,
            self.percent(),
            self.elapsed.as_millis()
        )?;
        if let Some(eta) = self.eta() {
            write!(f, " [ETA {}ms]", eta.as_millis())?;
        }
        Ok(())
    }
}
