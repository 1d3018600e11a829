//! Editor session state machine tests
//!
//! Headless backend + manual timer; the audio side is driven inline.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use sd_bridge::{AudioBus, EngineStatus, MessageBus, SnapshotMode, UiBus};
use sd_core::saw::{CUTOFF, RESONANCE};
use sd_core::{EditorConfig, MessageKind, ParamBank};
use sd_editor::{
    EditorError, EditorSession, HostTimer, ManualTimer, PointerState, SessionState, TimerId,
};
use sd_gpu::headless::{GpuTiming, HeadlessBackend, HeadlessStats, ResourceKind};
use sd_gpu::{DeviceRegistry, WindowHandle};

const CHILD: WindowHandle = WindowHandle::Headless { id: 10 };
const PARENT: WindowHandle = WindowHandle::Headless { id: 20 };

type Registry = Arc<DeviceRegistry<HeadlessBackend>>;

struct Fixture {
    registry: Registry,
    stats: Arc<HeadlessStats>,
    status: Arc<EngineStatus>,
    ui: Option<UiBus>,
    audio: AudioBus,
}

fn fixture(timing: GpuTiming) -> Fixture {
    let backend = HeadlessBackend::with_timing(timing);
    let stats = backend.stats();
    let bus = MessageBus::new(Arc::new(ParamBank::saw_demo()), 256);
    let status = Arc::clone(bus.status());
    let (ui, audio) = bus.split();

    Fixture {
        registry: DeviceRegistry::new(backend),
        stats,
        status,
        ui: Some(ui),
        audio,
    }
}

fn config() -> EditorConfig {
    EditorConfig {
        debug_layer: false,
        ..EditorConfig::default()
    }
}

fn session<T: HostTimer>(fx: &mut Fixture, timer: T) -> EditorSession<HeadlessBackend, T> {
    let ui = fx.ui.take().unwrap();
    EditorSession::new(Arc::clone(&fx.registry), config(), timer, ui).unwrap()
}

fn attached(fx: &mut Fixture) -> EditorSession<HeadlessBackend, ManualTimer> {
    let mut s = session(fx, ManualTimer::new());
    s.create(CHILD).unwrap();
    s.attach(PARENT).unwrap();
    s
}

/// Center of a control, in window pixels
fn point_at<T: HostTimer>(s: &EditorSession<HeadlessBackend, T>, fraction: f32) -> (f32, f32) {
    let rect = s.view().slot(CUTOFF).unwrap().rect;
    (rect.x + rect.w * fraction, rect.y + rect.h / 2.0)
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_full_lifecycle() {
    let mut fx = fixture(GpuTiming::Immediate);
    let mut s = session(&mut fx, ManualTimer::new());
    assert_eq!(s.state(), SessionState::Uninitialized);

    s.create(CHILD).unwrap();
    assert_eq!(s.state(), SessionState::Created);
    assert_eq!(fx.stats.live(ResourceKind::SwapChain), 1);
    assert!(!s.timer().is_running());

    assert_eq!(s.attach(PARENT).unwrap(), Some(SnapshotMode::Immediate));
    assert_eq!(s.state(), SessionState::Attached);
    assert_eq!(s.timer().period(), Some(Duration::from_millis(30)));
    assert!(fx.status.ui_attached());

    let id = s.timer_id().unwrap();
    let report = s.on_timer(id).unwrap().unwrap();
    assert_eq!(report.fence_value, 1);
    assert!(report.draw_commands > 0);
    assert_eq!(s.frames_rendered(), 1);

    let bus = s.destroy().unwrap();
    assert_eq!(s.state(), SessionState::Destroyed);
    assert!(!s.timer().is_running());
    assert_eq!(fx.stats.live_total(), 0);
    assert!(!fx.status.ui_attached());
    assert_eq!(bus.value(CUTOFF), Some(69.0));
}

#[test]
fn test_ticks_ignored_before_attach() {
    let mut fx = fixture(GpuTiming::Immediate);
    let mut s = session(&mut fx, ManualTimer::new());

    assert!(s.tick().unwrap().is_none());
    s.create(CHILD).unwrap();
    assert!(s.tick().unwrap().is_none());
    assert!(s.on_timer(1).unwrap().is_none());
    assert_eq!(fx.stats.submissions(), 0);
}

#[test]
fn test_foreign_timer_ignored() {
    let mut fx = fixture(GpuTiming::Immediate);
    let mut s = attached(&mut fx);
    let id = s.timer_id().unwrap();

    assert!(s.on_timer(id + 100).unwrap().is_none());
    assert_eq!(fx.stats.submissions(), 0);
}

#[test]
fn test_lifecycle_order_enforced() {
    let mut fx = fixture(GpuTiming::Immediate);
    let mut s = session(&mut fx, ManualTimer::new());

    assert!(matches!(
        s.attach(PARENT),
        Err(EditorError::InvalidState { state: SessionState::Uninitialized, .. })
    ));
    s.create(CHILD).unwrap();
    assert!(matches!(s.create(CHILD), Err(EditorError::InvalidState { .. })));

    s.destroy().unwrap();
    assert!(matches!(s.destroy(), Err(EditorError::InvalidState { .. })));
    assert!(s.tick().unwrap().is_none());
}

#[test]
fn test_reattach_keeps_single_timer() {
    let mut fx = fixture(GpuTiming::Immediate);
    let mut s = attached(&mut fx);
    let other = WindowHandle::Headless { id: 30 };

    assert_eq!(s.attach(other).unwrap(), None);
    assert_eq!(s.parent(), Some(other));
    assert_eq!(s.timer().registrations(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESIZE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_resize_only_while_attached() {
    let mut fx = fixture(GpuTiming::Immediate);
    let mut s = session(&mut fx, ManualTimer::new());

    assert!(matches!(s.resize(800, 600), Err(EditorError::InvalidState { .. })));
    s.create(CHILD).unwrap();
    assert!(matches!(
        s.resize(800, 600),
        Err(EditorError::InvalidState { state: SessionState::Created, .. })
    ));

    s.attach(PARENT).unwrap();
    assert!(s.resize(800, 600).unwrap());
    assert_eq!(s.surface().unwrap().size(), (800, 600));
    assert_eq!(s.view().size(), (800, 600));

    s.destroy().unwrap();
    assert!(matches!(
        s.resize(640, 480),
        Err(EditorError::InvalidState { state: SessionState::Destroyed, .. })
    ));
}

#[test]
fn test_minimized_resize_ignored() {
    let mut fx = fixture(GpuTiming::Immediate);
    let mut s = attached(&mut fx);

    assert!(!s.resize(0, 0).unwrap());
    assert!(!s.resize(800, 0).unwrap());
    assert_eq!(s.surface().unwrap().size(), (540, 324));
}

#[test]
fn test_resize_waits_for_last_frame() {
    let mut fx = fixture(GpuTiming::Manual);
    let mut s = attached(&mut fx);
    for _ in 0..7 {
        s.tick().unwrap();
    }

    s.resize(800, 600).unwrap();
    assert_eq!(fx.stats.fence_waits().last(), Some(&7));
    assert_eq!(s.surface().unwrap().back_buffer_count(), 3);
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEARDOWN
// ═══════════════════════════════════════════════════════════════════════════════

/// Records what was still alive when the host timer was stopped
#[derive(Clone)]
struct TeardownTimer {
    stats: Arc<HeadlessStats>,
    status: Arc<EngineStatus>,
    seen: Arc<Mutex<Vec<(usize, bool)>>>,
}

impl HostTimer for TeardownTimer {
    fn register(&mut self, _period: Duration) -> Option<TimerId> {
        Some(7)
    }

    fn unregister(&mut self, id: TimerId) -> bool {
        self.seen
            .lock()
            .push((self.stats.live(ResourceKind::SwapChain), self.status.ui_attached()));
        id == 7
    }
}

#[test]
fn test_destroy_order() {
    let mut fx = fixture(GpuTiming::Immediate);

    // Live GPU resources at every flush request; the last comes from detach
    let at_flush = Arc::new(Mutex::new(Vec::new()));
    {
        let stats = Arc::clone(&fx.stats);
        let at_flush = Arc::clone(&at_flush);
        fx.ui
            .as_mut()
            .unwrap()
            .set_flush_request(move || at_flush.lock().push(stats.live_total()));
    }

    let timer = TeardownTimer {
        stats: Arc::clone(&fx.stats),
        status: Arc::clone(&fx.status),
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let mut s = session(&mut fx, timer.clone());
    s.create(CHILD).unwrap();
    s.attach(PARENT).unwrap();

    // Leave a drag open so detach has an EndEdit to send
    let (x, y) = point_at(&s, 0.5);
    s.set_pointer(PointerState::at(x, y, true));
    s.tick().unwrap();

    s.destroy().unwrap();

    // Timer stopped first: GPU and bus still up
    assert_eq!(*timer.seen.lock(), vec![(1, true)]);
    // Bus detached last: GPU already gone
    assert_eq!(at_flush.lock().last(), Some(&0));

    let kinds: Vec<MessageKind> = {
        let mut out = Vec::new();
        fx.audio.apply_ui_events(|m| out.push(m.kind));
        out
    };
    assert_eq!(kinds.first(), Some(&MessageKind::BeginEdit));
    assert_eq!(kinds.last(), Some(&MessageKind::EndEdit));
}

#[test]
fn test_drop_releases_everything() {
    let mut fx = fixture(GpuTiming::Manual);
    {
        let mut s = attached(&mut fx);
        s.tick().unwrap();
        s.tick().unwrap();
    }
    assert_eq!(fx.stats.live_total(), 0);
    assert!(!fx.status.ui_attached());
}

#[test]
fn test_create_failure_stays_uninitialized() {
    let mut fx = fixture(GpuTiming::Immediate);
    let mut s = session(&mut fx, ManualTimer::new());

    fx.stats.fail_next(ResourceKind::SwapChain);
    assert!(matches!(s.create(CHILD), Err(EditorError::Gpu(_))));
    assert_eq!(s.state(), SessionState::Uninitialized);
    assert_eq!(fx.stats.live_total(), 0);
    assert_eq!(fx.registry.retain_count(), 0);

    s.create(CHILD).unwrap();
    assert_eq!(s.state(), SessionState::Created);
}

#[test]
fn test_device_lost_aborts_render_loop() {
    let mut fx = fixture(GpuTiming::Manual);
    let mut s = attached(&mut fx);
    for _ in 0..3 {
        s.tick().unwrap();
    }

    fx.stats.lose_device();
    let err = s.tick().unwrap_err();
    assert!(err.is_fatal());
    assert!(s.is_render_aborted());
    assert!(!s.timer().is_running());

    // Not retried
    let submissions = fx.stats.submissions();
    assert!(s.tick().unwrap().is_none());
    assert_eq!(fx.stats.submissions(), submissions);

    // Teardown still completes
    s.destroy().unwrap();
    assert_eq!(fx.stats.live_total(), 0);
}

#[test]
fn test_two_sessions_share_device() {
    let backend = HeadlessBackend::new();
    let stats = backend.stats();
    let registry = DeviceRegistry::new(backend);
    let start = Arc::new(Barrier::new(2));

    // Both editors open at the same time from their own threads
    let open = |id: u64| {
        let registry = Arc::clone(&registry);
        let start = Arc::clone(&start);
        let (ui, audio) = MessageBus::new(Arc::new(ParamBank::saw_demo()), 64).split();
        let handle = thread::spawn(move || {
            let mut s = EditorSession::new(registry, config(), ManualTimer::new(), ui).unwrap();
            start.wait();
            s.create(WindowHandle::Headless { id }).unwrap();
            s.attach(WindowHandle::Headless { id: id + 100 }).unwrap();
            for _ in 0..4 {
                s.tick().unwrap();
            }
            s
        });
        (handle, audio)
    };
    let (first, _first_audio) = open(11);
    let (second, _second_audio) = open(12);
    let mut first = first.join().unwrap();
    let mut second = second.join().unwrap();

    assert_eq!(stats.devices_created(), 1);
    assert_eq!(registry.retain_count(), 2);

    first.destroy().unwrap();
    assert!(registry.is_live());
    assert_eq!(stats.live(ResourceKind::Device), 1);
    assert_eq!(stats.live(ResourceKind::SwapChain), 1);

    // The survivor keeps rendering on the shared device
    for _ in 0..6 {
        let report = second.tick().unwrap().unwrap();
        assert!(report.draw_commands > 0);
    }
    assert_eq!(second.frames_rendered(), 10);
    assert_eq!(stats.allocator_violations(), 0);

    second.destroy().unwrap();
    assert!(!registry.is_live());
    assert_eq!(stats.live_total(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETER FLOW
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_deferred_snapshot_while_processing() {
    let mut fx = fixture(GpuTiming::Immediate);
    fx.audio.params().set(RESONANCE, 0.25);
    fx.status.start_processing();

    let mut s = session(&mut fx, ManualTimer::new());
    s.create(CHILD).unwrap();
    assert_eq!(s.attach(PARENT).unwrap(), Some(SnapshotMode::Deferred));
    assert_eq!(s.bus().unwrap().value(RESONANCE), Some(0.7));

    // Next audio block publishes, next UI tick drains
    assert_eq!(fx.audio.service_refresh(), 10);
    s.tick().unwrap();
    assert_eq!(s.bus().unwrap().value(RESONANCE), Some(0.25));
}

#[test]
fn test_drag_reaches_audio_thread() {
    let mut fx = fixture(GpuTiming::Immediate);
    let mut s = attached(&mut fx);

    let (x0, y) = point_at(&s, 0.25);
    let (x1, _) = point_at(&s, 0.75);
    for pointer in [
        PointerState::at(x0, y, true),
        PointerState::at(x1, y, true),
        PointerState::at(x1, y, false),
    ] {
        s.set_pointer(pointer);
        s.tick().unwrap();
    }

    let mut seen = Vec::new();
    fx.audio.apply_ui_events(|m| seen.push((m.id, m.kind)));
    assert_eq!(
        seen,
        vec![
            (CUTOFF, MessageKind::BeginEdit),
            (CUTOFF, MessageKind::AdjustValue),
            (CUTOFF, MessageKind::AdjustValue),
            (CUTOFF, MessageKind::EndEdit),
        ]
    );

    let final_value = s.bus().unwrap().value(CUTOFF).unwrap();
    assert_eq!(fx.audio.params().get(CUTOFF), Some(final_value));
    assert!(final_value > 69.0);
}

#[test]
fn test_polyphony_shown() {
    let mut fx = fixture(GpuTiming::Immediate);
    let mut s = attached(&mut fx);

    fx.status.set_polyphony(12);
    s.tick().unwrap();
    assert_eq!(s.view().polyphony(), 12);
}
