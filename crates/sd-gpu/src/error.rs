//! GPU error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("Failed to create {resource}: {reason}")]
    ResourceCreation {
        resource: &'static str,
        reason: String,
    },

    #[error("Device lost: {0}")]
    DeviceLost(String),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Command allocator reset while fence {0} is still pending")]
    AllocatorBusy(u64),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl GpuError {
    pub fn creation(resource: &'static str, reason: impl ToString) -> Self {
        Self::ResourceCreation {
            resource,
            reason: reason.to_string(),
        }
    }

    /// Errors after which the render loop must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DeviceLost(_))
    }
}

pub type GpuResult<T> = Result<T, GpuError>;
