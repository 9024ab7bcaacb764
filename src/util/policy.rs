use tracing::warn;

use crate::error::Result;

/// How a step's failure affects the surrounding stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// The error propagates and aborts the stage.
    Fatal,
    /// The error is logged and the stage continues.
    BestEffort,
}

impl StepPolicy {
    pub fn apply<T>(self, step: &str, result: Result<T>) -> Result<Option<T>> {
        match (self, result) {
            (_, Ok(value)) => Ok(Some(value)),
            (StepPolicy::Fatal, Err(err)) => Err(err),
            (StepPolicy::BestEffort, Err(err)) => {
                warn!(step, error = %err, "best-effort step failed; continuing");
                Ok(None)
            }
        }
    }
}
