//! sd-gpu: Frame pipelining for the editor's presentation surface
//!
//! Keeps several frames in flight against one swap chain:
//! - Shared, reference-counted graphics device ([`DeviceRegistry`])
//! - Per-frame command allocators guarded by fence values ([`FramePool`])
//! - Swap chain, render targets, submit/present/signal ([`PresentationSurface`])
//!
//! The graphics API sits behind [`GpuBackend`]. [`headless::HeadlessBackend`]
//! simulates the GPU timeline for tests and offscreen runs; the `wgpu`
//! feature adds a native backend.

mod backend;
mod device;
mod draw;
mod error;
mod frame_pool;
mod surface;

pub mod headless;
#[cfg(feature = "wgpu")]
pub mod wgpu_backend;

pub use backend::*;
pub use device::*;
pub use draw::*;
pub use error::*;
pub use frame_pool::*;
pub use surface::*;
