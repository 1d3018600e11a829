//! Engine status shared read-only with the editor
//!
//! Values that propagate without messages: the audio side stores, the UI side
//! loads. `update_count` bumps whenever processing starts or stops so the UI
//! can notice transitions it slept through.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

#[derive(Debug, Default)]
pub struct EngineStatus {
    update_count: AtomicU32,
    is_processing: AtomicBool,
    polyphony: AtomicI32,
    refresh_requested: AtomicBool,
    ui_attached: AtomicBool,
}

impl EngineStatus {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── processing state (audio side writes) ───────────────────────────────

    pub fn start_processing(&self) {
        self.is_processing.store(true, Ordering::Release);
        self.update_count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn stop_processing(&self) {
        self.is_processing.store(false, Ordering::Release);
        self.update_count.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::Acquire)
    }

    #[inline]
    pub fn update_count(&self) -> u32 {
        self.update_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_polyphony(&self, voices: i32) {
        self.polyphony.store(voices, Ordering::Relaxed);
    }

    #[inline]
    pub fn polyphony(&self) -> i32 {
        self.polyphony.load(Ordering::Relaxed)
    }

    // ─── snapshot refresh (UI requests, audio consumes) ─────────────────────

    /// Ask the processing thread to publish every parameter at its next block
    #[inline]
    pub fn request_refresh(&self) {
        self.refresh_requested.store(true, Ordering::Release);
    }

    #[inline]
    pub fn refresh_pending(&self) -> bool {
        self.refresh_requested.load(Ordering::Acquire)
    }

    /// Consume a pending refresh request
    #[inline]
    pub fn take_refresh(&self) -> bool {
        self.refresh_requested.swap(false, Ordering::AcqRel)
    }

    // ─── editor presence ────────────────────────────────────────────────────

    #[inline]
    pub fn set_ui_attached(&self, attached: bool) {
        self.ui_attached.store(attached, Ordering::Release);
    }

    /// The audio side only publishes snapshots while an editor drains them
    #[inline]
    pub fn ui_attached(&self) -> bool {
        self.ui_attached.load(Ordering::Acquire)
    }
}
