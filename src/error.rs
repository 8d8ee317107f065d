//! Process-level error type.
//!
//! Every fallible path in the toolbox funnels into `AppError` so the binary
//! can map failures onto stable exit codes:
//!
//! - `INPUT` (2): unreadable/malformed inputs, bad CLI combinations
//! - `EMPTY` (3): nothing survived parsing/QC
//! - `NUMERIC` (4): numeric or internal failures

use std::path::Path;

/// Exit code for input/usage errors.
pub const INPUT: u8 = 2;
/// Exit code for an empty surviving dataset.
pub const EMPTY: u8 = 3;
/// Exit code for numeric/internal failures.
pub const NUMERIC: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it occurred on.
    pub fn io(action: &str, path: &Path, err: std::io::Error) -> Self {
        Self::new(INPUT, format!("Failed to {action} '{}': {err}", path.display()))
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
