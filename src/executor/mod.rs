//! Bounded parallel executor
//!
//! Runs deferred tasks with a fixed concurrency limit:
//! - Dispatches tasks in submission order from a shared queue
//! - Keeps at most `limit` tasks in flight
//! - Collects results in completion order
//! - Stops dispatching on the first failure

mod progress;
mod runner;
mod state;
mod task;

pub use progress::Progress;
pub use runner::*;
pub use task::{Task, TaskFuture};
