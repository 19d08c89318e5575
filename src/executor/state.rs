//! Shared state for a single bounded run
//!
//! One [`RunState`] is created per run and shared by every fiber through an
//! `Arc`. Locks are only held between suspension points, never across an
//! `.await`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::RunError;

use super::Task;

/// Final outcome delivered to the caller
pub(crate) type RunOutcome<T, E> = Result<Vec<T>, RunError<E>>;

/// Pending queue, results, failure flag and the settle guard for one run
pub(crate) struct RunState<T, E> {
    /// Not-yet-dispatched tasks with their submission position
    pending: Mutex<VecDeque<(usize, Task<T, E>)>>,

    /// Results in completion order
    results: Mutex<Vec<T>>,

    /// Set on the first failure; stops further dispatch
    failed: AtomicBool,

    /// Taken exactly once by whichever fiber settles the run
    settle_tx: Mutex<Option<oneshot::Sender<RunOutcome<T, E>>>>,

    /// Number of tasks submitted
    total: usize,

    /// When the run started
    started_at: Instant,
}

impl<T, E> RunState<T, E> {
    /// Create state for a run over `tasks`
    pub fn new(tasks: Vec<Task<T, E>>, settle_tx: oneshot::Sender<RunOutcome<T, E>>) -> Self {
        let total = tasks.len();
        Self {
            pending: Mutex::new(tasks.into_iter().enumerate().collect()),
            results: Mutex::new(Vec::with_capacity(total)),
            failed: AtomicBool::new(false),
            settle_tx: Mutex::new(Some(settle_tx)),
            total,
            started_at: Instant::now(),
        }
    }

    /// Dequeue the head of the pending queue
    pub fn next_task(&self) -> Option<(usize, Task<T, E>)> {
        self.pending.lock().pop_front()
    }

    /// Number of tasks still waiting for dispatch
    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether a failure has been recorded
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Whether nobody is waiting for the outcome any more
    ///
    /// True once the caller has dropped the run future, or after the run has
    /// been settled.
    pub fn is_abandoned(&self) -> bool {
        self.settle_tx
            .lock()
            .as_ref()
            .map_or(true, |tx| tx.is_closed())
    }

    /// Record a failure; returns true only for the first caller
    pub fn mark_failed(&self) -> bool {
        !self.failed.swap(true, Ordering::SeqCst)
    }

    /// Append a result and return the new completed count
    pub fn push_result(&self, value: T) -> usize {
        let mut results = self.results.lock();
        results.push(value);
        results.len()
    }

    /// Move the collected results out
    pub fn take_results(&self) -> Vec<T> {
        std::mem::take(&mut *self.results.lock())
    }

    /// Deliver the outcome to the caller
    ///
    /// Only the first call has any effect; later calls return false and drop
    /// their outcome.
    pub fn settle(&self, outcome: RunOutcome<T, E>) -> bool {
        match self.settle_tx.lock().take() {
            // Fibers stop dispatching once the receiver is gone, but a task
            // already in flight can still finish after that
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Total tasks submitted
    pub fn total(&self) -> usize {
        self.total
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_state(n: usize) -> (RunState<usize, String>, oneshot::Receiver<RunOutcome<usize, String>>) {
        let tasks = (0..n)
            .map(|i| Task::new(move || async move { Ok(i) }))
            .collect();
        let (tx, rx) = oneshot::channel();
        (RunState::new(tasks, tx), rx)
    }

    #[test]
    fn test_queue_is_fifo() {
        let (state, _rx) = make_state(3);
        assert_eq!(state.total(), 3);
        assert_eq!(state.pending_count(), 3);

        let positions: Vec<usize> = std::iter::from_fn(|| state.next_task())
            .map(|(position, _)| position)
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(state.pending_count(), 0);
        assert!(state.next_task().is_none());
    }

    #[test]
    fn test_mark_failed_once() {
        let (state, _rx) = make_state(1);
        assert!(!state.is_failed());
        assert!(state.mark_failed());
        assert!(!state.mark_failed());
        assert!(state.is_failed());
    }

    #[test]
    fn test_results_accumulate() {
        let (state, _rx) = make_state(2);
        assert_eq!(state.push_result(10), 1);
        assert_eq!(state.push_result(20), 2);
        assert_eq!(state.take_results(), vec![10, 20]);
        assert!(state.take_results().is_empty());
    }

    #[test]
    fn test_abandoned_when_receiver_dropped() {
        let (state, rx) = make_state(2);
        assert!(!state.is_abandoned());

        drop(rx);
        assert!(state.is_abandoned());
    }

    #[test]
    fn test_abandoned_after_settle() {
        let (state, _rx) = make_state(1);
        assert!(state.settle(Ok(vec![0])));
        assert!(state.is_abandoned());
    }

    #[tokio::test]
    async fn test_settle_only_once() {
        let (state, rx) = make_state(1);
        assert!(state.settle(Err(RunError::Task("first".to_string()))));
        assert!(!state.settle(Err(RunError::Task("second".to_string()))));

        match rx.await {
            Ok(Err(RunError::Task(msg))) => assert_eq!(msg, "first"),
            other => panic!("unexpected outcome: {:?}", other.map(|o| o.is_ok())),
        }
    }
}
