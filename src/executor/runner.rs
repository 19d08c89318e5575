//! Bounded parallel runner
//!
//! Runs a list of deferred tasks with at most `limit` in flight, collecting
//! results in completion order and failing fast on the first error.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::num::IntErrorKind;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::error::{ConfigError, RunError};

use super::state::{RunOutcome, RunState};
use super::{Progress, Task};

/// Callback receiving human-readable lifecycle messages
pub type Logger = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback receiving a [`Progress`] snapshot after each successful task
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

// ─────────────────────────────────────────────────────────────────
// Run Options
// ─────────────────────────────────────────────────────────────────

/// Optional hooks for a run
#[derive(Clone, Default)]
pub struct RunOptions {
    logger: Option<Logger>,
    progress: Option<ProgressCallback>,
}

impl RunOptions {
    /// Options with the default logger and progress reporting
    pub fn new() -> Self {
        Self::default()
    }

    /// Send lifecycle messages to `logger` instead of `tracing`
    pub fn with_logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Call `progress` after every successful task
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("logger", &self.logger.as_ref().map(|_| "<fn>"))
            .field("progress", &self.progress.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Default logger: forward to `tracing` at debug level
fn default_logger() -> Logger {
    Arc::new(|msg: &str| debug!(target: "batchlimit::executor", "{}", msg))
}

/// Default progress reporting: format a percentage/ETA line for the logger
fn default_progress(logger: Logger) -> ProgressCallback {
    Arc::new(move |progress: Progress| logger(&progress.to_string()))
}

// ─────────────────────────────────────────────────────────────────
// Limit Parsing
// ─────────────────────────────────────────────────────────────────

/// Parse a concurrency limit given as text (environment, config, CLI)
pub fn parse_limit(raw: &str) -> Result<usize, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::Missing { param: "limit" });
    }

    match raw.parse::<i128>() {
        Ok(n) if n >= 1 => usize::try_from(n).map_err(|_| ConfigError::AboveMaximum {
            param: "limit",
            max: usize::MAX,
        }),
        Ok(_) => Err(ConfigError::BelowMinimum { param: "limit", min: 1 }),
        Err(e) => Err(match e.kind() {
            IntErrorKind::PosOverflow => ConfigError::AboveMaximum {
                param: "limit",
                max: usize::MAX,
            },
            IntErrorKind::NegOverflow => ConfigError::BelowMinimum { param: "limit", min: 1 },
            _ if raw.parse::<f64>().map_or(false, f64::is_finite) => {
                ConfigError::NotAWholeNumber { param: "limit" }
            }
            _ => {
                let found = if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
                    "boolean"
                } else {
                    "string"
                };
                ConfigError::NotANumber { param: "limit", found }
            }
        }),
    }
}

#[derive(Debug, Clone)]
enum LimitInput {
    Value(usize),
    Text(String),
}

// ─────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────

/// Builder for a [`LimitedRun`]
///
/// `tasks` and `limit` are required; [`build`](Self::build) validates them
/// synchronously before anything is dispatched.
pub struct LimitedRunBuilder<T, E> {
    tasks: Option<Vec<Task<T, E>>>,
    limit: Option<LimitInput>,
    options: RunOptions,
}

impl<T, E> LimitedRunBuilder<T, E> {
    fn new() -> Self {
        Self {
            tasks: None,
            limit: None,
            options: RunOptions::default(),
        }
    }

    /// Tasks to run, in dispatch order
    pub fn tasks(mut self, tasks: Vec<Task<T, E>>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Maximum number of tasks in flight
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(LimitInput::Value(limit));
        self
    }

    /// Maximum number of tasks in flight, parsed from text at build time
    pub fn limit_text(mut self, limit: impl Into<String>) -> Self {
        self.limit = Some(LimitInput::Text(limit.into()));
        self
    }

    /// Replace all options at once
    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Send lifecycle messages to `logger`
    pub fn logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.options = self.options.with_logger(logger);
        self
    }

    /// Call `progress` after every successful task
    pub fn progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.options = self.options.with_progress(progress);
        self
    }

    /// Validate the parameters and produce a run that has not started yet
    pub fn build(self) -> Result<LimitedRun<T, E>, ConfigError> {
        let tasks = self.tasks.ok_or(ConfigError::Missing { param: "tasks" })?;
        let limit = match self.limit.ok_or(ConfigError::Missing { param: "limit" })? {
            LimitInput::Text(raw) => parse_limit(&raw)?,
            LimitInput::Value(0) => return Err(ConfigError::BelowMinimum { param: "limit", min: 1 }),
            LimitInput::Value(n) => n,
        };

        let logger = self.options.logger.unwrap_or_else(default_logger);
        let progress = self
            .options
            .progress
            .unwrap_or_else(|| default_progress(logger.clone()));

        Ok(LimitedRun {
            tasks,
            limit,
            logger,
            progress,
            run_id: Uuid::new_v4().to_string()[..8].to_string(),
        })
    }
}

/// Validate `tasks` and `limit` and return a run ready to be awaited
///
/// Configuration problems are reported here, synchronously. Failures of the
/// tasks themselves come back from awaiting the returned [`LimitedRun`].
pub fn run_limited<T, E>(
    tasks: Vec<Task<T, E>>,
    limit: usize,
    options: RunOptions,
) -> Result<LimitedRun<T, E>, ConfigError> {
    LimitedRun::builder()
        .tasks(tasks)
        .limit(limit)
        .options(options)
        .build()
}

// ─────────────────────────────────────────────────────────────────
// Limited Run
// ─────────────────────────────────────────────────────────────────

/// A validated batch of tasks with a concurrency limit
///
/// Nothing is dispatched until the run is awaited.
pub struct LimitedRun<T, E> {
    tasks: Vec<Task<T, E>>,
    limit: usize,
    logger: Logger,
    progress: ProgressCallback,
    run_id: String,
}

impl<T, E> LimitedRun<T, E> {
    /// Start building a run
    pub fn builder() -> LimitedRunBuilder<T, E> {
        LimitedRunBuilder::new()
    }

    /// Number of tasks in the run
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the run has no tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Concurrency limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Short identifier used to correlate log lines
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl<T, E> LimitedRun<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    /// Run every task with at most `limit` in flight
    ///
    /// Resolves with the results in completion order, or with the first
    /// failure. Tasks already in flight when a failure is recorded keep
    /// running in the background and their outcomes are discarded.
    pub async fn run(self) -> Result<Vec<T>, RunError<E>> {
        let span = info_span!(
            "batch",
            run_id = %self.run_id,
            total = self.tasks.len(),
            limit = self.limit
        );
        self.dispatch().instrument(span).await
    }

    async fn dispatch(self) -> Result<Vec<T>, RunError<E>> {
        let LimitedRun {
            tasks,
            limit,
            logger,
            progress,
            ..
        } = self;

        logger(&format!(
            "Preparing to execute {} tasks with parallel limit {}",
            tasks.len(),
            limit
        ));
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let fibers = limit.min(tasks.len());
        let (settle_tx, settle_rx) = oneshot::channel::<RunOutcome<T, E>>();
        let state = Arc::new(RunState::new(tasks, settle_tx));

        for index in 0..fibers {
            logger(&format!("Starting execution fiber {}", index));
            let fiber = Fiber {
                name: format!("fiber-{}", index),
                state: state.clone(),
                logger: logger.clone(),
                progress: progress.clone(),
            };
            tokio::spawn(fiber.run().in_current_span());
        }

        // Only the fibers hold the state now; if they all exit without
        // settling, the sender is dropped and the receiver errors.
        drop(state);

        settle_rx.await.unwrap_or(Err(RunError::Aborted))
    }
}

impl<T, E> IntoFuture for LimitedRun<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    type Output = Result<Vec<T>, RunError<E>>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

impl<T, E> fmt::Debug for LimitedRun<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimitedRun")
            .field("run_id", &self.run_id)
            .field("tasks", &self.tasks.len())
            .field("limit", &self.limit)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Fibers
// ─────────────────────────────────────────────────────────────────

/// One worker draining the shared queue
struct Fiber<T, E> {
    name: String,
    state: Arc<RunState<T, E>>,
    logger: Logger,
    progress: ProgressCallback,
}

impl<T, E> Fiber<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    fn log(&self, msg: &str) {
        (self.logger)(&format!("[{}] {}", self.name, msg));
    }

    async fn run(self) {
        loop {
            if self.state.is_failed() {
                self.log("Terminating due to failure");
                return;
            }
            if self.state.is_abandoned() {
                self.log("Terminating because the run was dropped");
                return;
            }

            let Some((position, task)) = self.state.next_task() else {
                self.log("Terminating due to no more tasks");
                return;
            };

            let factory = match task.into_factory() {
                Ok(factory) => factory,
                Err(reason) => {
                    self.state.mark_failed();
                    self.log(&format!("Task at position {} is not runnable: {}", position, reason));
                    self.state.settle(Err(RunError::MalformedTask { position, reason }));
                    return;
                }
            };

            // Another fiber may have failed, or the caller gone, while we were dequeuing
            if self.state.is_failed() {
                self.log("Terminating due to failure");
                return;
            }
            if self.state.is_abandoned() {
                self.log("Terminating because the run was dropped");
                return;
            }

            match factory().await {
                Ok(value) => {
                    self.log("Task completed successfully");
                    let completed = self.state.push_result(value);
                    let total = self.state.total();
                    (self.progress)(Progress::new(completed, total, self.state.elapsed()));

                    if completed == total {
                        self.log("All tasks completed successfully");
                        let results = self.state.take_results();
                        self.state.settle(Ok(results));
                        return;
                    }
                }
                Err(err) => {
                    self.state.mark_failed();
                    self.log(&format!("Task failed: {}", err));
                    if !self.state.settle(Err(RunError::Task(err))) {
                        self.log("Run already settled, error discarded");
                    }
                    return;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
