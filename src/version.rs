//! Version and build information embedded by `build.rs`

use std::fmt;

/// Build information embedded at compile time
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    git_dirty: &'static str,
    pub build_timestamp: &'static str,
    pub target: &'static str,
    pub host: &'static str,
    pub profile: &'static str,
    pub rustc_version: &'static str,
}

impl BuildInfo {
    /// Information for the running binary
    pub const fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("BATCHLIMIT_GIT_HASH"),
            git_branch: env!("BATCHLIMIT_GIT_BRANCH"),
            git_dirty: env!("BATCHLIMIT_GIT_DIRTY"),
            build_timestamp: env!("BATCHLIMIT_BUILD_TIMESTAMP"),
            target: env!("BATCHLIMIT_TARGET"),
            host: env!("BATCHLIMIT_HOST"),
            profile: env!("BATCHLIMIT_PROFILE"),
            rustc_version: env!("BATCHLIMIT_RUSTC_VERSION"),
        }
    }

    /// Whether the working tree had uncommitted changes at build time
    pub fn git_dirty(&self) -> bool {
        self.git_dirty == "true"
    }

    /// Version with git hash, e.g. "0.1.0-abc12345"
    pub fn full_version(&self) -> String {
        let dirty = if self.git_dirty() { "-dirty" } else { "" };
        format!("{}-{}{}", self.version, self.git_hash, dirty)
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.full_version())?;
        writeln!(f)?;
        writeln!(f, "Build Information:")?;
        writeln!(f, "  Git Hash:   {}", self.git_hash)?;
        writeln!(f, "  Git Branch: {}", self.git_branch)?;
        writeln!(f, "  Built:      {} ({})", self.build_timestamp, self.profile)?;
        writeln!(f, "  Target:     {} (host {})", self.target, self.host)?;
        writeln!(f, "  Compiler:   {}", self.rustc_version)
    }
}
