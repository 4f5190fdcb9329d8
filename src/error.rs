use std::fmt;

use kbplacer::{ConfigError, PipelineError};
use kbplacer_place::ElementError;

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad command line: missing arguments or unparsable flag values.
    Usage = 1,
    /// Unreadable or invalid layout, config or footprint list.
    Input = 2,
    /// Placement failed or the report could not be written.
    Processing = 3,
}

#[derive(Debug)]
pub struct CliError {
    pub code: ErrorCode,
    pub message: String,
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Usage,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Input,
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Processing,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.code as i32
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Layout(e) => Self::input(format!("invalid layout: {e}")),
            PipelineError::Placement(e) => Self::processing(format!("placement failed: {e}")),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::input(err.to_string())
    }
}

impl From<ElementError> for CliError {
    fn from(err: ElementError) -> Self {
        Self::usage(err.to_string())
    }
}
