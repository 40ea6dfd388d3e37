use crate::step::Step;
use afni::{Grid, GridError, ToolError};
use std::path::PathBuf;
use thiserror::Error;

pub const EXIT_USAGE: i32 = 2;
pub const EXIT_INPUT_NOT_FOUND: i32 = 3;
pub const EXIT_GRID_MISMATCH: i32 = 4;
pub const EXIT_TOOL_FAILURE: i32 = 5;
pub const EXIT_IO_FAILURE: i32 = 6;
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input not found: {}", .path.display())]
    InputNotFound { path: PathBuf },
    #[error("input {} is unreadable", .path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: GridError,
    },
    #[error(
        "grid of {} ({found_grid}) does not match {} ({expected_grid})",
        .found.display(),
        .expected.display()
    )]
    GridMismatch {
        expected: PathBuf,
        expected_grid: Grid,
        found: PathBuf,
        found_grid: Grid,
    },
    #[error("step `{step}` failed")]
    ExternalToolFailure {
        step: Step,
        #[source]
        source: ToolError,
    },
    #[error("step `{step}` failed: {context}")]
    Io {
        step: Step,
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Usage(String),
    #[error("interrupted during step `{step}`")]
    Interrupted { step: Step },
}

impl Error {
    /// Process exit status for this failure category.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) => EXIT_USAGE,
            Error::InputNotFound { .. } | Error::UnreadableInput { .. } => EXIT_INPUT_NOT_FOUND,
            Error::GridMismatch { .. } => EXIT_GRID_MISMATCH,
            Error::ExternalToolFailure { .. } => EXIT_TOOL_FAILURE,
            Error::Io { .. } => EXIT_IO_FAILURE,
            Error::Interrupted { .. } => EXIT_INTERRUPTED,
        }
    }

    /// The step that was running, when the failure happened inside one.
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::ExternalToolFailure { step, .. }
            | Error::Io { step, .. }
            | Error::Interrupted { step } => Some(*step),
            Error::InputNotFound { .. }
            | Error::UnreadableInput { .. }
            | Error::GridMismatch { .. } => Some(Step::ValidateInputs),
            Error::Usage(_) => None,
        }
    }

    pub(crate) fn io<S: Into<String>>(step: Step, context: S, source: std::io::Error) -> Error {
        Error::Io {
            step,
            context: context.into(),
            source,
        }
    }
}
