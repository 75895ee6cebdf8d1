//! Error types for the processing module.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("tool not found: {}", path.display())]
    ToolNotFound { path: PathBuf },

    #[error("{tool} failed with exit code {code:?}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: Option<String>,
    },

    #[error("{tool} timed out after {timeout_secs} seconds")]
    Timeout { tool: String, timeout_secs: u64 },

    #[error("no subdatasets found in {}", source_path.display())]
    NoSubdatasets { source_path: PathBuf },

    #[error("unexpected tool output: {0}")]
    InvalidOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessingError {
    pub fn tool_failed(tool: impl Into<String>, code: Option<i32>, stderr: Option<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            code,
            stderr,
        }
    }
}
