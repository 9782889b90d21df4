//! The CLI's own error type (§10.2): bridges filesystem, config, and
//! dependency-graph failures into one type with a stable exit code.
//!
//! Per-file scan/parse/resolve/transform diagnostics are not reported
//! through this type — those are collected into `Diagnostics` and
//! rendered directly (see `diagnostics.rs` in this crate) since §7 keeps
//! them non-fatal to the rest of the run. `PsxError` covers the things
//! that abort a command outright: bad usage, a missing config file that
//! *was* explicitly requested, an unreadable input, or a cycle that
//! aborts the whole project compile before any diagnostics exist.

use std::path::PathBuf;

use psxc_core::depgraph::DependencyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PsxError {
    #[error("invalid arguments: {message}")]
    Usage { message: String },

    #[error("{path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("config error: {0}")]
    Config(String),

    #[error("circular dependency: {0}")]
    Dependency(#[from] DependencyError),

    #[error("compilation failed with errors")]
    CompileFailed,
}

impl PsxError {
    pub fn usage(message: impl Into<String>) -> Self {
        PsxError::Usage { message: message.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PsxError::Io { path: path.into(), source }
    }

    /// Exit code per §6's table: 0 success, 1 compile error, 2 usage error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PsxError::Usage { .. } => 2,
            PsxError::Io { .. } | PsxError::Config(_) | PsxError::Dependency(_) | PsxError::CompileFailed => 1,
        }
    }
}
