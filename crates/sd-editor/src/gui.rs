//! Host GUI extension
//!
//! The calls a plugin host makes to show the editor: API negotiation,
//! create/destroy, embedding, sizing and scale. Holds the UI side of the
//! bus while no editor is open.

use std::sync::Arc;

use sd_bridge::{SnapshotMode, UiBus};
use sd_core::{EditorConfig, PREFERRED_HEIGHT, PREFERRED_WIDTH};
use sd_gpu::{DeviceRegistry, FrameReport, GpuBackend, WindowHandle};

use crate::{
    EditorError, EditorResult, EditorSession, HostTimer, PointerState, TimerId, WindowApi,
    WindowHost,
};

pub struct PluginGui<B: GpuBackend, T: HostTimer + Clone, W: WindowHost> {
    registry: Arc<DeviceRegistry<B>>,
    config: EditorConfig,
    timer: T,
    windows: W,
    idle_bus: Option<UiBus>,
    session: Option<EditorSession<B, T>>,
}

impl<B: GpuBackend, T: HostTimer + Clone, W: WindowHost> PluginGui<B, T, W> {
    /// Fails on an invalid config, before the host can open an editor
    pub fn new(
        registry: Arc<DeviceRegistry<B>>,
        config: EditorConfig,
        timer: T,
        windows: W,
        bus: UiBus,
    ) -> EditorResult<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            config,
            timer,
            windows,
            idle_bus: Some(bus),
            session: None,
        })
    }

    /// Embedded editors only, with the platform's native windowing API
    pub fn is_api_supported(&self, api: &str, is_floating: bool) -> bool {
        !is_floating && WindowApi::from_name(api).is_some_and(|a| Some(a) == WindowApi::native())
    }

    /// Create the editor and its GPU resources.
    ///
    /// On failure no editor exists and `create` may be retried.
    pub fn create(&mut self, api: &str, is_floating: bool) -> EditorResult<()> {
        if let Some(session) = &self.session {
            return Err(EditorError::InvalidState {
                operation: "create",
                state: session.state(),
            });
        }
        let api = WindowApi::from_name(api)
            .filter(|_| self.is_api_supported(api, is_floating))
            .ok_or_else(|| EditorError::UnsupportedApi(api.to_string()))?;
        let bus = self.idle_bus.take().ok_or(EditorError::NotCreated)?;

        let mut session = EditorSession::new(
            Arc::clone(&self.registry),
            self.config.clone(),
            self.timer.clone(),
            bus,
        )?;

        let Some(child) = self
            .windows
            .create_child(api, self.config.width, self.config.height)
        else {
            self.idle_bus = session.destroy().ok();
            return Err(EditorError::Window(format!(
                "window host refused a {} child",
                api.name()
            )));
        };

        if let Err(e) = session.create(child) {
            self.windows.destroy_child(child);
            self.idle_bus = session.destroy().ok();
            return Err(e);
        }

        self.session = Some(session);
        Ok(())
    }

    /// Embed into the host's window; the first call also starts rendering
    pub fn set_parent(&mut self, parent: WindowHandle) -> EditorResult<Option<SnapshotMode>> {
        let session = self.session.as_mut().ok_or(EditorError::NotCreated)?;
        let child = session.window().ok_or(EditorError::NotCreated)?;

        if !self.windows.reparent(child, parent) {
            return Err(EditorError::Window(format!("cannot embed into {:?}", parent)));
        }
        session.attach(parent)
    }

    /// Accept the host's size and resize the surface
    pub fn set_size(&mut self, width: u32, height: u32) -> EditorResult<bool> {
        let session = self.session.as_mut().ok_or(EditorError::NotCreated)?;
        session.resize(width, height)
    }

    pub fn get_size(&self) -> (u32, u32) {
        (PREFERRED_WIDTH, PREFERRED_HEIGHT)
    }

    pub fn can_resize(&self) -> bool {
        true
    }

    /// Any size the host proposes is fine
    pub fn adjust_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width, height)
    }

    /// Host-driven scaling is not supported
    pub fn set_scale(&mut self, scale: f64) -> bool {
        log::debug!("Ignoring host scale {}", scale);
        false
    }

    pub fn on_timer(&mut self, id: TimerId) -> EditorResult<Option<FrameReport>> {
        match self.session.as_mut() {
            Some(session) => session.on_timer(id),
            None => Ok(None),
        }
    }

    pub fn set_pointer(&mut self, pointer: PointerState) {
        if let Some(session) = self.session.as_mut() {
            session.set_pointer(pointer);
        }
    }

    /// Destroy the editor and take the bus back
    pub fn destroy(&mut self) -> EditorResult<()> {
        let mut session = self.session.take().ok_or(EditorError::NotCreated)?;
        let child = session.window();

        let bus = session.destroy()?;
        if let Some(child) = child {
            self.windows.destroy_child(child);
        }
        self.idle_bus = Some(bus);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&EditorSession<B, T>> {
        self.session.as_ref()
    }

    pub fn windows(&self) -> &W {
        &self.windows
    }

    /// UI side of the bus while no editor is open
    pub fn idle_bus(&self) -> Option<&UiBus> {
        self.idle_bus.as_ref()
    }
}
