//! CLI support for vero-lang
//!
//! The `vero` binary is a thin shell over these functions, so editors and
//! test runners can embed the same behaviour without spawning a process.

mod check;
mod compile;
mod convert;
mod explain;

pub use check::{execute_check, render_diagnostics, CheckOptions};
pub use compile::{execute_compile, CompileOptions};
pub use convert::{json_to_combinations, json_to_param};
pub use explain::{explain_code, explain_overview};

use std::io;

use thiserror::Error;

use crate::{selection::SelectionError, transpiler::ContractViolation};

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid parameter file: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error("No input provided. Pass a script file or pipe one to stdin.")]
    NoInput,
    #[error("Unknown error code: '{0}'\nRun 'vero explain' to list every code.")]
    UnknownCode(String),
    /// The script has errors; they were already reported.
    #[error("{0} error(s) found")]
    Failed(usize),
}
