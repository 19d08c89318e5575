//! Job manifests
//!
//! A manifest is a TOML file with one `[[job]]` table per job:
//!
//! ```toml
//! [[job]]
//! name = "lint"
//! command = "cargo"
//! args = ["clippy", "--quiet"]
//!
//! [[job]]
//! name = "warmup"
//! sleep_ms = 250
//! output = "warm"
//! ```
//!
//! Each job becomes one [`Task`]. A job without exactly one action becomes a
//! malformed task and fails the run when it is dispatched.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::executor::Task;

/// Parsed manifest file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobManifest {
    /// Jobs in dispatch order
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobSpec>,
}

/// One `[[job]]` entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSpec {
    /// Display name (defaults to `job-<position>`)
    pub name: Option<String>,

    /// Program to execute
    pub command: Option<String>,

    /// Arguments passed to `command`
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for `command`
    pub cwd: Option<String>,

    /// Wait this long, then succeed
    pub sleep_ms: Option<u64>,

    /// Output reported by a `sleep_ms` job
    pub output: Option<String>,

    /// Fail immediately with this message
    pub fail: Option<String>,
}

/// What a job does when dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAction {
    /// Run a process; non-zero exit fails the job
    Command {
        program: String,
        args: Vec<String>,
        cwd: Option<PathBuf>,
    },
    /// Sleep, then succeed with `output`
    Sleep { duration: Duration, output: String },
    /// Fail with `message`
    Fail { message: String },
}

/// Result of a successful job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutput {
    /// Job name
    pub name: String,

    /// Position of the job in the manifest
    pub position: usize,

    /// Captured stdout (trimmed) or the configured output
    pub output: String,

    /// Wall-clock duration of the job
    pub duration_ms: u64,
}

impl JobSpec {
    /// Name used in logs and results
    pub fn display_name(&self, position: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("job-{}", position))
    }

    /// Resolve the single action this job performs
    pub fn action(&self) -> std::result::Result<JobAction, String> {
        let mut actions = Vec::new();

        if let Some(ref program) = self.command {
            if program.trim().is_empty() {
                return Err("command is empty".to_string());
            }
            actions.push(JobAction::Command {
                program: program.clone(),
                args: self.args.clone(),
                cwd: self.cwd.as_deref().map(|c| PathBuf::from(crate::config::expand_path(c))),
            });
        }
        if let Some(ms) = self.sleep_ms {
            actions.push(JobAction::Sleep {
                duration: Duration::from_millis(ms),
                output: self.output.clone().unwrap_or_default(),
            });
        }
        if let Some(ref message) = self.fail {
            actions.push(JobAction::Fail {
                message: message.clone(),
            });
        }

        match actions.len() {
            0 => Err("no action configured (expected one of command, sleep_ms, fail)".to_string()),
            1 => Ok(actions.remove(0)),
            _ => Err("more than one action configured".to_string()),
        }
    }
}

impl JobManifest {
    /// Load a manifest from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let manifest = Self::parse(&content).map_err(|message| Error::ManifestParse {
            path: path.to_path_buf(),
            message,
        })?;
        debug!(path = %path.display(), jobs = manifest.jobs.len(), "Job manifest loaded");
        Ok(manifest)
    }

    /// Parse manifest text
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.message().to_string())
    }

    /// Turn every job into a task, keeping manifest order
    pub fn into_tasks(self) -> Vec<Task<JobOutput, Error>> {
        self.jobs
            .into_iter()
            .enumerate()
            .map(|(position, spec)| job_task(position, spec))
            .collect()
    }
}

/// Build the task for one job
fn job_task(position: usize, spec: JobSpec) -> Task<JobOutput, Error> {
    let name = spec.display_name(position);
    match spec.action() {
        Ok(action) => Task::new(move || run_job(position, name, action)),
        Err(reason) => Task::malformed(format!("job '{}': {}", name, reason)),
    }
}

async fn run_job(position: usize, name: String, action: JobAction) -> Result<JobOutput> {
    let started = Instant::now();
    info!(job = %name, position, "Job started");

    let output = match action {
        JobAction::Command { program, args, cwd } => {
            let mut cmd = Command::new(&program);
            cmd.args(&args);
            if let Some(dir) = cwd {
                cmd.current_dir(dir);
            }
            let out = cmd
                .output()
                .await
                .map_err(|e| Error::job_failed(&name, format!("failed to spawn '{}': {}", program, e)))?;
            if !out.status.success() {
                let stderr = String::from_utf8_lossy(&out.stderr);
                return Err(Error::job_failed(
                    &name,
                    format!("'{}' exited with {}: {}", program, out.status, stderr.trim()),
                ));
            }
            String::from_utf8_lossy(&out.stdout).trim().to_string()
        }
        JobAction::Sleep { duration, output } => {
            tokio::time::sleep(duration).await;
            output
        }
        JobAction::Fail { message } => return Err(Error::job_failed(&name, message)),
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    info!(job = %name, duration_ms, "Job finished");

    Ok(JobOutput {
        name,
        position,
        output,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::run_limited;
    use crate::executor::RunOptions;
    use crate::error::RunError;

    #[test]
    fn test_parse_manifest() {
        let manifest = JobManifest::parse(
            r#"
[[job]]
name = "greet"
command = "echo"
args = ["hello"]

[[job]]
sleep_ms = 5
output = "rested"
"#,
        )
        .unwrap();

        assert_eq!(manifest.jobs.len(), 2);
        assert_eq!(manifest.jobs[0].display_name(0), "greet");
        assert_eq!(manifest.jobs[1].display_name(1), "job-1");
        assert_eq!(
            manifest.jobs[1].action(),
            Ok(JobAction::Sleep {
                duration: Duration::from_millis(5),
                output: "rested".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = JobManifest::parse("").unwrap();
        assert!(manifest.jobs.is_empty());
    }

    #[test]
    fn test_job_needs_exactly_one_action() {
        let none = JobSpec::default();
        assert!(none.action().unwrap_err().contains("no action"));

        let both = JobSpec {
            sleep_ms: Some(1),
            fail: Some("x".to_string()),
            ..Default::default()
        };
        assert!(both.action().unwrap_err().contains("more than one"));

        let blank = JobSpec {
            command: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.action().unwrap_err(), "command is empty");
    }

    #[test]
    fn test_malformed_job_becomes_malformed_task() {
        let manifest = JobManifest {
            jobs: vec![JobSpec::default()],
        };
        let tasks = manifest.into_tasks();
        assert!(!tasks[0].is_runnable());
    }

    #[test]
    fn test_manifest_not_found() {
        let err = JobManifest::load(Path::new("/nonexistent/jobs.toml")).unwrap_err();
        assert!(matches!(err, Error::ManifestNotFound { .. }));
    }

    #[tokio::test]
    async fn test_sleep_and_fail_jobs_through_executor() {
        let manifest = JobManifest::parse(
            r#"
[[job]]
name = "a"
sleep_ms = 1
output = "one"

[[job]]
name = "b"
fail = "broken"
"#,
        )
        .unwrap();

        let err = run_limited(manifest.into_tasks(), 1, RunOptions::new())
            .unwrap()
            .await
            .unwrap_err();
        match err {
            RunError::Task(Error::JobFailed { job, message }) => {
                assert_eq!(job, "b");
                assert_eq!(message, "broken");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_job_captures_stdout() {
        let output = run_job(
            0,
            "echo".to_string(),
            JobAction::Command {
                program: "echo".to_string(),
                args: vec!["hello".to_string()],
                cwd: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(output.output, "hello");
        assert_eq!(output.position, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_job_non_zero_exit_fails() {
        let err = run_job(
            3,
            "false".to_string(),
            JobAction::Command {
                program: "false".to_string(),
                args: vec![],
                cwd: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::JobFailed { ref job, .. } if job == "false"));
    }
}
