//! Error types for synthgrid

use thiserror::Error;

use crate::clip::ClipId;

#[derive(Debug, Error)]
pub enum SynthgridError {
    #[error("Engine failed to start: {0}")]
    EngineStart(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Clip not found: {0}")]
    ClipNotFound(ClipId),
    #[error("Lane out of range: {0}")]
    LaneOutOfRange(usize),
    #[error("Invalid composition: {0}")]
    Composition(String),
}

pub type Result<T> = std::result::Result<T, SynthgridError>;

/// Failures reported by a patch engine implementation
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Audio output failed to initialize: {0}")]
    Start(String),
    #[error("Trigger rejected: {0}")]
    Trigger(String),
}

impl From<EngineError> for SynthgridError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Start(msg) | EngineError::Trigger(msg) => SynthgridError::EngineStart(msg),
        }
    }
}
