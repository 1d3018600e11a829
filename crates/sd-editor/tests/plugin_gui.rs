//! Host GUI extension tests

use std::sync::Arc;

use sd_bridge::{AudioBus, MessageBus, SnapshotMode};
use sd_core::{EditorConfig, ParamBank};
use sd_editor::{
    EditorError, HeadlessWindows, ManualTimer, PluginGui, SessionState, WindowApi,
};
use sd_gpu::headless::{HeadlessBackend, HeadlessStats, ResourceKind};
use sd_gpu::{DeviceRegistry, WindowHandle};

const HOST: WindowHandle = WindowHandle::Headless { id: 500 };

type Gui = PluginGui<HeadlessBackend, ManualTimer, HeadlessWindows>;

fn native() -> &'static str {
    WindowApi::native().unwrap().name()
}

fn gui_on(registry: &Arc<DeviceRegistry<HeadlessBackend>>) -> (Gui, AudioBus) {
    let (ui, audio) = MessageBus::new(Arc::new(ParamBank::saw_demo()), 256).split();
    let config = EditorConfig {
        debug_layer: false,
        ..EditorConfig::default()
    };
    let gui = PluginGui::new(
        Arc::clone(registry),
        config,
        ManualTimer::new(),
        HeadlessWindows::new(),
        ui,
    )
    .unwrap();
    (gui, audio)
}

fn gui() -> (Gui, AudioBus, Arc<HeadlessStats>) {
    let backend = HeadlessBackend::new();
    let stats = backend.stats();
    let (gui, audio) = gui_on(&DeviceRegistry::new(backend));
    (gui, audio, stats)
}

#[test]
fn test_api_negotiation() {
    let (gui, _audio, _stats) = gui();

    assert!(gui.is_api_supported(native(), false));
    assert!(!gui.is_api_supported(native(), true));
    assert!(!gui.is_api_supported("wayland", false));

    let foreign = ["win32", "cocoa", "x11"]
        .into_iter()
        .find(|name| *name != native())
        .unwrap();
    assert!(!gui.is_api_supported(foreign, false));
}

#[test]
fn test_size_negotiation() {
    let (mut gui, _audio, _stats) = gui();

    assert_eq!(gui.get_size(), (540, 324));
    assert!(gui.can_resize());
    assert_eq!(gui.adjust_size(1000, 17), (1000, 17));
    assert!(!gui.set_scale(2.0));
}

#[test]
fn test_open_render_close() {
    let (mut gui, _audio, stats) = gui();

    gui.create(native(), false).unwrap();
    assert!(gui.is_open());
    assert!(gui.idle_bus().is_none());
    assert_eq!(gui.windows().live_children(), 1);

    assert_eq!(gui.set_parent(HOST).unwrap(), Some(SnapshotMode::Immediate));
    let session = gui.session().unwrap();
    assert_eq!(session.state(), SessionState::Attached);
    let child = session.window().unwrap();
    assert_eq!(gui.windows().parent_of(child), Some(HOST));

    let id = session.timer_id().unwrap();
    assert!(gui.on_timer(id).unwrap().is_some());
    assert!(gui.set_size(800, 600).unwrap());
    assert!(!gui.set_size(0, 0).unwrap());
    assert!(gui.on_timer(id).unwrap().is_some());
    assert_eq!(stats.presents(), 2);

    gui.destroy().unwrap();
    assert!(!gui.is_open());
    assert!(gui.idle_bus().is_some());
    assert_eq!(gui.windows().live_children(), 0);
    assert_eq!(stats.live_total(), 0);
}

#[test]
fn test_reopen_after_close() {
    let (mut gui, _audio, stats) = gui();

    for _ in 0..2 {
        gui.create(native(), false).unwrap();
        gui.set_parent(HOST).unwrap();
        gui.destroy().unwrap();
    }
    assert_eq!(stats.devices_created(), 2);
    assert_eq!(stats.live_total(), 0);
}

#[test]
fn test_calls_before_create() {
    let (mut gui, _audio, _stats) = gui();

    assert!(matches!(gui.set_parent(HOST), Err(EditorError::NotCreated)));
    assert!(matches!(gui.set_size(800, 600), Err(EditorError::NotCreated)));
    assert!(matches!(gui.destroy(), Err(EditorError::NotCreated)));
    assert!(gui.on_timer(1).unwrap().is_none());
}

#[test]
fn test_double_create_rejected() {
    let (mut gui, _audio, _stats) = gui();

    gui.create(native(), false).unwrap();
    assert!(matches!(
        gui.create(native(), false),
        Err(EditorError::InvalidState { operation: "create", .. })
    ));
    assert_eq!(gui.windows().live_children(), 1);
}

#[test]
fn test_unsupported_api_keeps_bus() {
    let (mut gui, _audio, _stats) = gui();

    assert!(matches!(
        gui.create(native(), true),
        Err(EditorError::UnsupportedApi(_))
    ));
    assert!(gui.idle_bus().is_some());
    assert!(!gui.is_open());
}

#[test]
fn test_create_failure_can_retry() {
    let (mut gui, _audio, stats) = gui();

    stats.fail_next(ResourceKind::CommandQueue);
    assert!(matches!(gui.create(native(), false), Err(EditorError::Gpu(_))));
    assert!(!gui.is_open());
    assert!(gui.idle_bus().is_some());
    assert_eq!(gui.windows().live_children(), 0);
    assert_eq!(stats.live_total(), 0);

    gui.create(native(), false).unwrap();
    gui.set_parent(HOST).unwrap();
    assert!(gui.is_open());
}

#[test]
fn test_two_editors_share_device() {
    let backend = HeadlessBackend::new();
    let stats = backend.stats();
    let registry = DeviceRegistry::new(backend);
    let (mut first, _a) = gui_on(&registry);
    let (mut second, _b) = gui_on(&registry);

    first.create(native(), false).unwrap();
    second.create(native(), false).unwrap();
    assert_eq!(stats.devices_created(), 1);
    assert_eq!(registry.retain_count(), 2);

    first.destroy().unwrap();
    assert_eq!(stats.live(ResourceKind::Device), 1);
    second.destroy().unwrap();
    assert_eq!(stats.live(ResourceKind::Device), 0);
}
