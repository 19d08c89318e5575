//! batchlimit - bounded-concurrency task runner
//!
//! The core is [`executor`]: hand it a list of deferred tasks and a limit,
//! and it runs at most `limit` of them at a time, failing fast on the first
//! error.
//!
//! ```no_run
//! use batchlimit::executor::{run_limited, RunOptions, Task};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let tasks: Vec<Task<u64, std::io::Error>> = (0..10)
//!     .map(|i| Task::new(move || async move { Ok(i * 2) }))
//!     .collect();
//!
//! let results = run_limited(tasks, 3, RunOptions::new())?.await?;
//! assert_eq!(results.len(), 10);
//! # Ok(())
//! # }
//! ```
//!
//! The rest of the crate backs the `batchlimit` binary, which runs the jobs
//! of a TOML manifest through the executor.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod logging;
pub mod version;

pub use error::{ConfigError, Error, Result, RunError};
