//! Editor session lifecycle
//!
//! ```text
//! Uninitialized --create--> Created --attach--> Attached --destroy--> Destroyed
//! ```
//!
//! Render ticks do nothing outside `Attached`, and `resize` is rejected
//! there, so no frame or resize can race teardown. Destroy order: stop the
//! timer, release GPU resources, detach the bus.

use std::sync::Arc;

use sd_bridge::{SnapshotMode, UiBus};
use sd_core::EditorConfig;
use sd_gpu::{DeviceRegistry, FrameReport, GpuBackend, PresentationSurface, SurfaceConfig, WindowHandle};

use crate::{
    ControlState, EditorError, EditorResult, HostTimer, PointerState, SawDemoView, TimerId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Created,
    Attached,
    Destroyed,
}

pub struct EditorSession<B: GpuBackend, T: HostTimer> {
    state: SessionState,
    config: EditorConfig,
    registry: Arc<DeviceRegistry<B>>,
    timer: T,
    timer_id: Option<TimerId>,
    surface: Option<PresentationSurface<B>>,
    bus: Option<UiBus>,
    view: SawDemoView,
    controls: ControlState,
    window: Option<WindowHandle>,
    parent: Option<WindowHandle>,
    render_aborted: bool,
    frames_rendered: u64,
}

impl<B: GpuBackend, T: HostTimer> EditorSession<B, T> {
    /// Session owning `bus` until destroyed; no GPU work happens yet
    pub fn new(
        registry: Arc<DeviceRegistry<B>>,
        config: EditorConfig,
        timer: T,
        bus: UiBus,
    ) -> EditorResult<Self> {
        config.validate()?;
        let view = SawDemoView::new(config.width, config.height);

        Ok(Self {
            state: SessionState::Uninitialized,
            config,
            registry,
            timer,
            timer_id: None,
            surface: None,
            bus: Some(bus),
            view,
            controls: ControlState::default(),
            window: None,
            parent: None,
            render_aborted: false,
            frames_rendered: 0,
        })
    }

    fn require(&self, operation: &'static str, expected: SessionState) -> EditorResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EditorError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════

    /// Allocate GPU resources for the editor's child window.
    ///
    /// On failure nothing is kept and the session stays `Uninitialized`.
    pub fn create(&mut self, window: WindowHandle) -> EditorResult<()> {
        self.require("create", SessionState::Uninitialized)?;

        let surface =
            PresentationSurface::create(&self.registry, window, SurfaceConfig::from(&self.config))?;
        self.surface = Some(surface);
        self.window = Some(window);
        self.state = SessionState::Created;

        log::info!("Editor session created for {:?}", window);
        Ok(())
    }

    /// Embed into the host's parent window.
    ///
    /// The first attach publishes the parameter snapshot and starts the
    /// timer; later calls only record the new parent and return `None`.
    pub fn attach(&mut self, parent: WindowHandle) -> EditorResult<Option<SnapshotMode>> {
        if self.state == SessionState::Attached {
            log::debug!("Editor re-parented to {:?}", parent);
            self.parent = Some(parent);
            return Ok(None);
        }
        self.require("attach", SessionState::Created)?;

        let bus = self.bus.as_mut().ok_or(EditorError::NotCreated)?;
        let mode = bus.attach();

        self.timer_id = self.timer.register(self.config.timer_interval());
        if self.timer_id.is_none() {
            log::warn!("Host refused the editor timer; frames render only on explicit ticks");
        }

        self.parent = Some(parent);
        self.state = SessionState::Attached;
        log::info!("Editor attached to {:?} (snapshot {:?})", parent, mode);
        Ok(Some(mode))
    }

    /// Tear down in order: timer, GPU resources, bus. Returns the bus.
    ///
    /// GPU errors while quiescing are logged; teardown always completes.
    pub fn destroy(&mut self) -> EditorResult<UiBus> {
        if self.state == SessionState::Destroyed {
            return Err(EditorError::InvalidState {
                operation: "destroy",
                state: self.state,
            });
        }

        self.stop_timer();

        if let Some(surface) = self.surface.take() {
            if let Err(e) = surface.destroy() {
                log::error!("GPU teardown incomplete: {}", e);
            }
        }

        let mut bus = self.bus.take().ok_or(EditorError::NotCreated)?;
        bus.detach();

        self.state = SessionState::Destroyed;
        log::info!(
            "Editor session destroyed after {} frame(s)",
            self.frames_rendered
        );
        Ok(bus)
    }

    fn stop_timer(&mut self) {
        if let Some(id) = self.timer_id.take() {
            if !self.timer.unregister(id) {
                log::warn!("Host did not know editor timer {}", id);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RENDERING
    // ═══════════════════════════════════════════════════════════════════════

    /// Host timer callback. Ticks for other timers are ignored.
    pub fn on_timer(&mut self, id: TimerId) -> EditorResult<Option<FrameReport>> {
        if self.timer_id != Some(id) {
            return Ok(None);
        }
        self.tick()
    }

    /// Drain parameter updates and render one frame.
    ///
    /// No-op unless attached. A fatal GPU error stops the timer and every
    /// later tick is ignored.
    pub fn tick(&mut self) -> EditorResult<Option<FrameReport>> {
        if self.state != SessionState::Attached || self.render_aborted {
            return Ok(None);
        }

        let (Some(surface), Some(bus)) = (self.surface.as_mut(), self.bus.as_mut()) else {
            return Err(EditorError::NotCreated);
        };

        bus.drain_inbound();

        let view = &mut self.view;
        let controls = &mut self.controls;
        match surface.render_frame(|list| view.render(bus, controls, list)) {
            Ok(report) => {
                self.frames_rendered += 1;
                Ok(Some(report))
            }
            Err(e) if e.is_fatal() => {
                log::error!("Render loop aborted: {}", e);
                self.render_aborted = true;
                self.stop_timer();
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Host resize. Zero dimensions (minimized) are ignored with `Ok(false)`.
    pub fn resize(&mut self, width: u32, height: u32) -> EditorResult<bool> {
        self.require("resize", SessionState::Attached)?;

        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return Ok(false);
        }

        let surface = self.surface.as_mut().ok_or(EditorError::NotCreated)?;
        surface.resize(width, height)?;
        self.view.relayout(width, height);
        self.config.width = width;
        self.config.height = height;
        Ok(true)
    }

    /// Pointer input for the next frame
    pub fn set_pointer(&mut self, pointer: PointerState) {
        self.controls.set_pointer(pointer);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn bus(&self) -> Option<&UiBus> {
        self.bus.as_ref()
    }

    pub fn surface(&self) -> Option<&PresentationSurface<B>> {
        self.surface.as_ref()
    }

    pub fn view(&self) -> &SawDemoView {
        &self.view
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_id(&self) -> Option<TimerId> {
        self.timer_id
    }

    pub fn window(&self) -> Option<WindowHandle> {
        self.window
    }

    pub fn parent(&self) -> Option<WindowHandle> {
        self.parent
    }

    pub fn is_render_aborted(&self) -> bool {
        self.render_aborted
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl<B: GpuBackend, T: HostTimer> Drop for EditorSession<B, T> {
    fn drop(&mut self) {
        if self.state != SessionState::Destroyed {
            // Same order as destroy; the bus is dropped with us
            self.stop_timer();
            self.surface.take();
            if let Some(bus) = self.bus.as_mut() {
                bus.detach();
            }
        }
    }
}
