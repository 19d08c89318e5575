//! Build script for batchlimit
//!
//! Embeds git, target and compiler details as `BATCHLIMIT_*` environment
//! variables read by `src/version.rs`.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let dirty = match run("git", &["status", "--porcelain"]) {
        Some(status) if !status.is_empty() => "true",
        Some(_) => "false",
        None => "unknown",
    };

    let vars = [
        ("GIT_HASH", run("git", &["rev-parse", "--short=8", "HEAD"])),
        ("GIT_BRANCH", run("git", &["rev-parse", "--abbrev-ref", "HEAD"])),
        ("GIT_DIRTY", Some(dirty.to_string())),
        (
            "BUILD_TIMESTAMP",
            Some(chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ),
        ("TARGET", env::var("TARGET").ok()),
        ("PROFILE", env::var("PROFILE").ok()),
        ("HOST", env::var("HOST").ok()),
        ("RUSTC_VERSION", run("rustc", &["--version"])),
    ];

    for (key, value) in vars {
        println!(
            "cargo:rustc-env=BATCHLIMIT_{}={}",
            key,
            value.unwrap_or_else(|| "unknown".to_string())
        );
    }
}

/// Run a command and return its trimmed stdout, or None if it failed
fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}
