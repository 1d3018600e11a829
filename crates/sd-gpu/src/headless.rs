//! Headless backend
//!
//! Simulates a GPU timeline without a graphics API. Every resource is
//! counted while alive, fences record the values waited on, and the last
//! submitted command list is kept for inspection. Faults (creation failure,
//! device loss) can be injected through [`HeadlessStats`].

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::{
    CommandAllocator, CommandQueue, CommandRecorder, DrawList, GpuBackend, GpuError, GpuFence,
    GpuResult, HeapKind, ResourceState, SwapChain, SwapChainDesc, WindowHandle,
};

// ═══════════════════════════════════════════════════════════════════════════════
// INSTRUMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Device,
    DescriptorHeap,
    CommandQueue,
    CommandAllocator,
    CommandList,
    Fence,
    SwapChain,
    RenderTarget,
}

impl ResourceKind {
    pub const ALL: [Self; 8] = [
        Self::Device,
        Self::DescriptorHeap,
        Self::CommandQueue,
        Self::CommandAllocator,
        Self::CommandList,
        Self::Fence,
        Self::SwapChain,
        Self::RenderTarget,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::DescriptorHeap => "descriptor heap",
            Self::CommandQueue => "command queue",
            Self::CommandAllocator => "command allocator",
            Self::CommandList => "command list",
            Self::Fence => "fence",
            Self::SwapChain => "swap chain",
            Self::RenderTarget => "render target",
        }
    }
}

/// When submitted work counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuTiming {
    /// Work completes as soon as the fence is signaled
    #[default]
    Immediate,
    /// Work completes only when waited on or via [`HeadlessStats::complete_all`]
    Manual,
}

/// One recorded command; render targets are named by back buffer index
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Reset,
    Transition {
        back_buffer: usize,
        before: ResourceState,
        after: ResourceState,
    },
    Clear {
        back_buffer: usize,
        color: [f32; 4],
    },
    Bind {
        back_buffer: usize,
    },
    Draw {
        commands: usize,
    },
    Close,
}

struct FenceTimeline {
    signaled: AtomicU64,
    completed: AtomicU64,
}

impl FenceTimeline {
    #[inline]
    fn complete_through(&self, value: u64) {
        self.completed.fetch_max(value, Ordering::AcqRel);
    }
}

/// Counters shared by every resource of one [`HeadlessBackend`]
pub struct HeadlessStats {
    timing: GpuTiming,
    live: [AtomicUsize; 8],
    created: [AtomicUsize; 8],
    releases: Mutex<Vec<ResourceKind>>,
    fail_next: Mutex<Option<ResourceKind>>,
    fail_present: AtomicBool,
    device_lost: AtomicBool,
    debug_layer: AtomicBool,
    timelines: Mutex<Vec<Weak<FenceTimeline>>>,
    fence_waits: Mutex<Vec<u64>>,
    allocator_resets: AtomicU64,
    allocator_violations: AtomicU64,
    submissions: AtomicU64,
    presents: AtomicU64,
    last_sync_interval: AtomicU32,
    latency_waits: AtomicU64,
    last_commands: Mutex<Vec<Recorded>>,
}

impl HeadlessStats {
    fn new(timing: GpuTiming) -> Self {
        Self {
            timing,
            live: Default::default(),
            created: Default::default(),
            releases: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            fail_present: AtomicBool::new(false),
            device_lost: AtomicBool::new(false),
            debug_layer: AtomicBool::new(false),
            timelines: Mutex::new(Vec::new()),
            fence_waits: Mutex::new(Vec::new()),
            allocator_resets: AtomicU64::new(0),
            allocator_violations: AtomicU64::new(0),
            submissions: AtomicU64::new(0),
            presents: AtomicU64::new(0),
            last_sync_interval: AtomicU32::new(0),
            latency_waits: AtomicU64::new(0),
            last_commands: Mutex::new(Vec::new()),
        }
    }

    // ─── Faults ────────────────────────────────────────────────────────────────

    /// Make the next creation of `kind` fail
    pub fn fail_next(&self, kind: ResourceKind) {
        *self.fail_next.lock() = Some(kind);
    }

    /// Make the next present fail without losing the device
    pub fn fail_next_present(&self) {
        self.fail_present.store(true, Ordering::Release);
    }

    /// Every later fence wait, present and submission reports device loss
    pub fn lose_device(&self) {
        self.device_lost.store(true, Ordering::Release);
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost.load(Ordering::Acquire)
    }

    fn check_lost(&self) -> GpuResult<()> {
        if self.is_device_lost() {
            Err(GpuError::DeviceLost("headless device removed".into()))
        } else {
            Ok(())
        }
    }

    // ─── Simulated GPU ─────────────────────────────────────────────────────────

    /// Finish all signaled work on every fence
    pub fn complete_all(&self) {
        let mut timelines = self.timelines.lock();
        timelines.retain(|weak| match weak.upgrade() {
            Some(t) => {
                t.complete_through(t.signaled.load(Ordering::Acquire));
                true
            }
            None => false,
        });
    }

    // ─── Counters ──────────────────────────────────────────────────────────────

    pub fn live(&self, kind: ResourceKind) -> usize {
        self.live[kind.index()].load(Ordering::Acquire)
    }

    pub fn live_total(&self) -> usize {
        ResourceKind::ALL.iter().map(|&k| self.live(k)).sum()
    }

    pub fn created(&self, kind: ResourceKind) -> usize {
        self.created[kind.index()].load(Ordering::Acquire)
    }

    pub fn devices_created(&self) -> usize {
        self.created(ResourceKind::Device)
    }

    /// Resource kinds in the order they were released
    pub fn releases(&self) -> Vec<ResourceKind> {
        self.releases.lock().clone()
    }

    /// Every value passed to a fence wait, in call order
    pub fn fence_waits(&self) -> Vec<u64> {
        self.fence_waits.lock().clone()
    }

    pub fn allocator_resets(&self) -> u64 {
        self.allocator_resets.load(Ordering::Relaxed)
    }

    /// Allocator resets attempted while their submission was still in flight
    pub fn allocator_violations(&self) -> u64 {
        self.allocator_violations.load(Ordering::Relaxed)
    }

    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::Relaxed)
    }

    pub fn presents(&self) -> u64 {
        self.presents.load(Ordering::Relaxed)
    }

    pub fn last_sync_interval(&self) -> u32 {
        self.last_sync_interval.load(Ordering::Relaxed)
    }

    pub fn latency_waits(&self) -> u64 {
        self.latency_waits.load(Ordering::Relaxed)
    }

    pub fn debug_layer_enabled(&self) -> bool {
        self.debug_layer.load(Ordering::Relaxed)
    }

    /// Commands of the most recent submission
    pub fn last_commands(&self) -> Vec<Recorded> {
        self.last_commands.lock().clone()
    }
}

/// Live-resource registration, undone on drop
struct Tracked {
    kind: ResourceKind,
    stats: Arc<HeadlessStats>,
}

impl Tracked {
    fn new(stats: &Arc<HeadlessStats>, kind: ResourceKind) -> GpuResult<Self> {
        {
            let mut fail = stats.fail_next.lock();
            if *fail == Some(kind) {
                *fail = None;
                return Err(GpuError::creation(kind.name(), "injected failure"));
            }
        }

        stats.created[kind.index()].fetch_add(1, Ordering::AcqRel);
        stats.live[kind.index()].fetch_add(1, Ordering::AcqRel);
        Ok(Self {
            kind,
            stats: Arc::clone(stats),
        })
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.stats.live[self.kind.index()].fetch_sub(1, Ordering::AcqRel);
        self.stats.releases.lock().push(self.kind);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOURCES
// ═══════════════════════════════════════════════════════════════════════════════

pub struct HeadlessDevice {
    _tracked: Tracked,
    debug_layer: bool,
}

impl HeadlessDevice {
    pub fn debug_layer(&self) -> bool {
        self.debug_layer
    }
}

pub struct HeadlessHeap {
    _tracked: Tracked,
    kind: HeapKind,
    capacity: usize,
}

impl HeadlessHeap {
    pub fn kind(&self) -> HeapKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

pub struct HeadlessFence {
    _tracked: Tracked,
    timeline: Arc<FenceTimeline>,
    stats: Arc<HeadlessStats>,
}

impl GpuFence for HeadlessFence {
    fn completed_value(&self) -> u64 {
        self.timeline.completed.load(Ordering::Acquire)
    }

    fn wait_for(&self, value: u64) -> GpuResult<()> {
        self.stats.fence_waits.lock().push(value);
        self.stats.check_lost()?;

        let signaled = self.timeline.signaled.load(Ordering::Acquire);
        if value > signaled {
            // A real wait would never return
            return Err(GpuError::DeviceLost(format!(
                "wait on fence value {} beyond last signal {}",
                value, signaled
            )));
        }

        self.timeline.complete_through(value);
        Ok(())
    }
}

struct AllocatorGuard {
    pending: Mutex<Option<(Arc<FenceTimeline>, u64)>>,
}

pub struct HeadlessAllocator {
    _tracked: Tracked,
    guard: Arc<AllocatorGuard>,
    stats: Arc<HeadlessStats>,
}

impl CommandAllocator for HeadlessAllocator {
    fn reset(&mut self) -> GpuResult<()> {
        let mut pending = self.guard.pending.lock();
        if let Some((timeline, value)) = pending.as_ref() {
            if timeline.completed.load(Ordering::Acquire) < *value {
                self.stats.allocator_violations.fetch_add(1, Ordering::Relaxed);
                return Err(GpuError::AllocatorBusy(*value));
            }
        }
        *pending = None;
        self.stats.allocator_resets.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

pub struct HeadlessRenderTarget {
    _tracked: Tracked,
    index: usize,
    views: Arc<AtomicUsize>,
}

impl HeadlessRenderTarget {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for HeadlessRenderTarget {
    fn drop(&mut self) {
        self.views.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct HeadlessCommandList {
    _tracked: Tracked,
    recorded: Vec<Recorded>,
    open: bool,
    allocator: Option<Arc<AllocatorGuard>>,
}

impl CommandRecorder for HeadlessCommandList {
    type Allocator = HeadlessAllocator;
    type Target = HeadlessRenderTarget;

    fn reset(&mut self, allocator: &mut HeadlessAllocator) -> GpuResult<()> {
        if self.open {
            return Err(GpuError::Backend("command list reset while recording".into()));
        }
        self.recorded.clear();
        self.recorded.push(Recorded::Reset);
        self.allocator = Some(Arc::clone(&allocator.guard));
        self.open = true;
        Ok(())
    }

    fn transition(&mut self, target: &HeadlessRenderTarget, before: ResourceState, after: ResourceState) {
        self.recorded.push(Recorded::Transition {
            back_buffer: target.index,
            before,
            after,
        });
    }

    fn clear(&mut self, target: &HeadlessRenderTarget, color: [f32; 4]) {
        self.recorded.push(Recorded::Clear {
            back_buffer: target.index,
            color,
        });
    }

    fn bind_target(&mut self, target: &HeadlessRenderTarget) {
        self.recorded.push(Recorded::Bind {
            back_buffer: target.index,
        });
    }

    fn draw(&mut self, list: &DrawList) {
        self.recorded.push(Recorded::Draw {
            commands: list.len(),
        });
    }

    fn close(&mut self) -> GpuResult<()> {
        if !self.open {
            return Err(GpuError::Backend("command list closed twice".into()));
        }
        self.recorded.push(Recorded::Close);
        self.open = false;
        Ok(())
    }
}

pub struct HeadlessQueue {
    _tracked: Tracked,
    stats: Arc<HeadlessStats>,
    last_executed: Option<Arc<AllocatorGuard>>,
}

impl CommandQueue for HeadlessQueue {
    type CommandList = HeadlessCommandList;
    type Fence = HeadlessFence;

    fn execute(&mut self, list: &mut HeadlessCommandList) -> GpuResult<()> {
        self.stats.check_lost()?;
        if list.open {
            return Err(GpuError::Backend("executed an open command list".into()));
        }

        *self.stats.last_commands.lock() = list.recorded.clone();
        self.stats.submissions.fetch_add(1, Ordering::Relaxed);
        self.last_executed = list.allocator.take();
        Ok(())
    }

    fn signal(&mut self, fence: &HeadlessFence, value: u64) -> GpuResult<()> {
        self.stats.check_lost()?;

        fence.timeline.signaled.fetch_max(value, Ordering::AcqRel);
        if self.stats.timing == GpuTiming::Immediate {
            fence.timeline.complete_through(value);
        }

        if let Some(guard) = self.last_executed.take() {
            *guard.pending.lock() = Some((Arc::clone(&fence.timeline), value));
        }
        Ok(())
    }
}

pub struct HeadlessSwapChain {
    _tracked: Tracked,
    stats: Arc<HeadlessStats>,
    window: WindowHandle,
    buffer_count: usize,
    width: u32,
    height: u32,
    current: usize,
    views: Arc<AtomicUsize>,
}

impl HeadlessSwapChain {
    pub fn window(&self) -> WindowHandle {
        self.window
    }
}

impl SwapChain for HeadlessSwapChain {
    fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn wait_frame_latency(&mut self) -> GpuResult<()> {
        self.stats.latency_waits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn current_back_buffer(&mut self) -> GpuResult<usize> {
        Ok(self.current)
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> GpuResult<()> {
        let views = self.views.load(Ordering::Acquire);
        if views != 0 {
            return Err(GpuError::Backend(format!(
                "resize with {} back buffer views still alive",
                views
            )));
        }
        self.width = width;
        self.height = height;
        self.current = 0;
        Ok(())
    }

    fn present(&mut self, sync_interval: u32) -> GpuResult<()> {
        self.stats.check_lost()?;
        if self.stats.fail_present.swap(false, Ordering::AcqRel) {
            return Err(GpuError::Surface("present rejected".into()));
        }
        self.stats.presents.fetch_add(1, Ordering::Relaxed);
        self.stats.last_sync_interval.store(sync_interval, Ordering::Relaxed);
        self.current = (self.current + 1) % self.buffer_count;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct HeadlessBackend {
    stats: Arc<HeadlessStats>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_timing(GpuTiming::Immediate)
    }

    pub fn with_timing(timing: GpuTiming) -> Self {
        Self {
            stats: Arc::new(HeadlessStats::new(timing)),
        }
    }

    pub fn stats(&self) -> Arc<HeadlessStats> {
        Arc::clone(&self.stats)
    }

    fn track(&self, kind: ResourceKind) -> GpuResult<Tracked> {
        Tracked::new(&self.stats, kind)
    }
}

impl GpuBackend for HeadlessBackend {
    type Device = HeadlessDevice;
    type DescriptorHeap = HeadlessHeap;
    type Queue = HeadlessQueue;
    type Allocator = HeadlessAllocator;
    type CommandList = HeadlessCommandList;
    type Fence = HeadlessFence;
    type SwapChain = HeadlessSwapChain;
    type RenderTarget = HeadlessRenderTarget;

    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_device(&self, debug_layer: bool) -> GpuResult<HeadlessDevice> {
        let tracked = self.track(ResourceKind::Device)?;
        self.stats.device_lost.store(false, Ordering::Release);
        self.stats.debug_layer.store(debug_layer, Ordering::Relaxed);
        Ok(HeadlessDevice {
            _tracked: tracked,
            debug_layer,
        })
    }

    fn create_descriptor_heap(
        &self,
        _device: &HeadlessDevice,
        kind: HeapKind,
        count: usize,
    ) -> GpuResult<HeadlessHeap> {
        Ok(HeadlessHeap {
            _tracked: self.track(ResourceKind::DescriptorHeap)?,
            kind,
            capacity: count,
        })
    }

    fn create_command_queue(&self, _device: &HeadlessDevice) -> GpuResult<HeadlessQueue> {
        Ok(HeadlessQueue {
            _tracked: self.track(ResourceKind::CommandQueue)?,
            stats: self.stats(),
            last_executed: None,
        })
    }

    fn create_command_allocator(&self, _device: &HeadlessDevice) -> GpuResult<HeadlessAllocator> {
        Ok(HeadlessAllocator {
            _tracked: self.track(ResourceKind::CommandAllocator)?,
            guard: Arc::new(AllocatorGuard {
                pending: Mutex::new(None),
            }),
            stats: self.stats(),
        })
    }

    fn create_command_list(
        &self,
        _device: &HeadlessDevice,
        _allocator: &HeadlessAllocator,
    ) -> GpuResult<HeadlessCommandList> {
        Ok(HeadlessCommandList {
            _tracked: self.track(ResourceKind::CommandList)?,
            recorded: Vec::new(),
            open: false,
            allocator: None,
        })
    }

    fn create_fence(&self, _device: &HeadlessDevice) -> GpuResult<HeadlessFence> {
        let tracked = self.track(ResourceKind::Fence)?;
        let timeline = Arc::new(FenceTimeline {
            signaled: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        });
        self.stats.timelines.lock().push(Arc::downgrade(&timeline));

        Ok(HeadlessFence {
            _tracked: tracked,
            timeline,
            stats: self.stats(),
        })
    }

    fn create_swap_chain(
        &self,
        _device: &HeadlessDevice,
        _queue: &HeadlessQueue,
        window: WindowHandle,
        desc: &SwapChainDesc,
    ) -> GpuResult<HeadlessSwapChain> {
        if desc.buffer_count < 2 {
            return Err(GpuError::creation(
                ResourceKind::SwapChain.name(),
                format!("need at least 2 buffers, got {}", desc.buffer_count),
            ));
        }

        Ok(HeadlessSwapChain {
            _tracked: self.track(ResourceKind::SwapChain)?,
            stats: self.stats(),
            window,
            buffer_count: desc.buffer_count,
            width: desc.width,
            height: desc.height,
            current: 0,
            views: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn create_render_target(
        &self,
        _device: &HeadlessDevice,
        swap_chain: &HeadlessSwapChain,
        heap: &HeadlessHeap,
        index: usize,
    ) -> GpuResult<HeadlessRenderTarget> {
        if index >= swap_chain.buffer_count || index >= heap.capacity {
            return Err(GpuError::creation(
                ResourceKind::RenderTarget.name(),
                format!("back buffer {} out of range", index),
            ));
        }

        let tracked = self.track(ResourceKind::RenderTarget)?;
        swap_chain.views.fetch_add(1, Ordering::AcqRel);
        Ok(HeadlessRenderTarget {
            _tracked: tracked,
            index,
            views: Arc::clone(&swap_chain.views),
        })
    }
}
