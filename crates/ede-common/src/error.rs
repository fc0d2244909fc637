//! Engine error type.
//!
//! One enum covers the semantic categories the core can fail with. Engine-
//! level failures terminate the current trial and are contained by the
//! coordinator; coordinator-level failures propagate to the caller. Frozen
//! swap rejections are instrumented outcomes, not errors, and never appear
//! here.

use thiserror::Error;

use crate::types::Capability;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A cell lacked a facet required by its algotype or role. Fatal;
    /// detected at engine construction where possible.
    #[error("cell at index {index} lacks required capability '{capability}'")]
    CapabilityMissing { index: usize, capability: Capability },

    /// A structural invariant broke (non-contiguous group boundaries after a
    /// merge, a poisoned global lock, …). Bug indicator; fatal.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// Cooperative cancellation was observed at a step boundary. Workers
    /// recover locally; the coordinator surfaces this after cleanup.
    #[error("run interrupted by cancellation")]
    Interrupted,

    /// A trial raised an exceptional condition. The coordinator cancels the
    /// remaining trials and reports the first failure with its cause.
    #[error("trial {trial} failed")]
    ExecutionFailed {
        trial: usize,
        #[source]
        source: Box<EngineError>,
    },

    /// The configuration bundle was rejected at build time.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}

impl EngineError {
    pub fn capability_missing(index: usize, capability: Capability) -> Self {
        Self::CapabilityMissing { index, capability }
    }

    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        Self::InvariantViolated(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    /// Wrap an engine-level failure as a trial failure for the coordinator.
    pub fn in_trial(self, trial: usize) -> Self {
        match self {
            // Keep the outermost trial attribution; do not re-wrap.
            e @ Self::ExecutionFailed { .. } => e,
            other => Self::ExecutionFailed {
                trial,
                source: Box::new(other),
            },
        }
    }

    /// True when the root cause is cooperative cancellation.
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Interrupted => true,
            Self::ExecutionFailed { source, .. } => source.is_interrupted(),
            _ => false,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
