//! sd-core: Shared types for the saw demo editor
//!
//! Provides the vocabulary used on both sides of the UI/audio boundary:
//! - Parameter identifiers and the messages that carry them between threads
//! - A lock-free parameter bank the audio thread owns and the UI may read
//! - Editor configuration (TOML-backed)
//! - The saw demo's fixed parameter table

mod config;
mod error;
mod params;
pub mod saw;

pub use config::*;
pub use error::*;
pub use params::*;

/// Preferred editor width reported to the host
pub const PREFERRED_WIDTH: u32 = 540;

/// Preferred editor height reported to the host
pub const PREFERRED_HEIGHT: u32 = 324;
