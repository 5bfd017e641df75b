//! Error taxonomy for the weaver (spec.md §7).
//!
//! Per-item failures (`TypeScanFailure`, `InstrumentationFailure`) are
//! logged and never surfaced as `Err` — the orchestrator downgrades them to
//! warnings in the `WeaveSummary`. Only file-level I/O and unrecoverable
//! metadata-graph errors propagate as `Err(WeaveError)`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeaveError {
    #[error("input module not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("failed to save instrumented module to {}: {source}", .path.display())]
    SaveFailure {
        path: PathBuf,
        #[source]
        source: dotscope::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata error: {0}")]
    Metadata(#[from] dotscope::Error),

    #[error("no top-level type named '{0}' to host a counter field")]
    MissingHelperOwner(String),
}

pub type Result<T> = std::result::Result<T, WeaveError>;
