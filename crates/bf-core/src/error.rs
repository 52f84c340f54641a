use thiserror::Error;

/// Non-fatal diagnostic for every failure mode in the interpreter. Library
/// code reports these instead of panicking; the engine decides per call site
/// whether to degrade (log and continue) or stop the owning block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct FlowError {
    pub code: String,
    pub message: String,
}

impl FlowError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
