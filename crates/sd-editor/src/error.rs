//! Editor error types

use sd_core::SdError;
use sd_gpu::GpuError;
use thiserror::Error;

use crate::SessionState;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    #[error("{operation} not allowed while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Editor not created")]
    NotCreated,

    #[error("Failed to create editor window: {0}")]
    Window(String),

    #[error("Window API not supported: {0}")]
    UnsupportedApi(String),

    #[error("Core error: {0}")]
    Core(#[from] SdError),
}

impl EditorError {
    /// Whether the render loop was aborted by this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Gpu(e) if e.is_fatal())
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
