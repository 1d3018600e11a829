//! Graphics API abstraction
//!
//! Modeled on explicit APIs (fences, command allocators, swap chains with
//! back buffers). Backends without explicit allocators or barriers implement
//! those operations as no-ops.

use crate::{DrawList, GpuResult};

/// Native window the surface presents into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowHandle {
    Win32 { hwnd: isize },
    Cocoa { ns_view: usize },
    X11 { window: u64 },
    /// Offscreen target with no native window
    Headless { id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapKind {
    /// One descriptor per back buffer
    RenderTargetViews,
    /// Font atlas / texture descriptors for the UI renderer
    ShaderResources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Present,
    RenderTarget,
}

/// Swap chain creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDesc {
    pub buffer_count: usize,
    pub width: u32,
    pub height: u32,
    /// Frames the presentation engine may queue before the latency wait blocks
    pub max_frame_latency: usize,
    pub vsync: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOURCE TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Monotonic GPU → CPU completion counter
pub trait GpuFence: Send {
    /// Highest value the GPU has reached
    fn completed_value(&self) -> u64;

    /// Block until the GPU reaches `value`.
    ///
    /// No timeout: the only way out other than completion is device loss,
    /// reported as [`crate::GpuError::DeviceLost`].
    fn wait_for(&self, value: u64) -> GpuResult<()>;
}

/// Command recording scratch memory for one frame in flight
pub trait CommandAllocator: Send {
    /// Reclaim memory. Only valid once the GPU finished with it.
    fn reset(&mut self) -> GpuResult<()>;
}

/// Records one frame's commands
pub trait CommandRecorder: Send {
    type Allocator;
    type Target;

    fn reset(&mut self, allocator: &mut Self::Allocator) -> GpuResult<()>;
    fn transition(&mut self, target: &Self::Target, before: ResourceState, after: ResourceState);
    fn clear(&mut self, target: &Self::Target, color: [f32; 4]);
    fn bind_target(&mut self, target: &Self::Target);
    fn draw(&mut self, list: &DrawList);
    fn close(&mut self) -> GpuResult<()>;
}

pub trait CommandQueue: Send {
    type CommandList;
    type Fence;

    /// Submit a closed command list
    fn execute(&mut self, list: &mut Self::CommandList) -> GpuResult<()>;

    /// Have the GPU set `fence` to `value` once prior submissions complete
    fn signal(&mut self, fence: &Self::Fence, value: u64) -> GpuResult<()>;
}

pub trait SwapChain: Send {
    fn buffer_count(&self) -> usize;
    fn size(&self) -> (u32, u32);

    /// Block on the frame-latency waitable, if the backend has one
    fn wait_frame_latency(&mut self) -> GpuResult<()>;

    /// Index of the back buffer the next frame renders into
    fn current_back_buffer(&mut self) -> GpuResult<usize>;

    /// Resize every buffer. All render targets must be released first.
    fn resize_buffers(&mut self, width: u32, height: u32) -> GpuResult<()>;

    /// `sync_interval` 0 presents immediately, 1 waits for vblank
    fn present(&mut self, sync_interval: u32) -> GpuResult<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

/// Resource factory for one graphics API
pub trait GpuBackend: Send + Sync + 'static {
    type Device: Send + Sync + 'static;
    type DescriptorHeap: Send;
    type Queue: CommandQueue<CommandList = Self::CommandList, Fence = Self::Fence>;
    type Allocator: CommandAllocator;
    type CommandList: CommandRecorder<Allocator = Self::Allocator, Target = Self::RenderTarget>;
    type Fence: GpuFence;
    type SwapChain: SwapChain;
    type RenderTarget: Send;

    fn name(&self) -> &'static str;

    fn create_device(&self, debug_layer: bool) -> GpuResult<Self::Device>;

    fn create_descriptor_heap(
        &self,
        device: &Self::Device,
        kind: HeapKind,
        count: usize,
    ) -> GpuResult<Self::DescriptorHeap>;

    fn create_command_queue(&self, device: &Self::Device) -> GpuResult<Self::Queue>;

    fn create_command_allocator(&self, device: &Self::Device) -> GpuResult<Self::Allocator>;

    /// Created closed, ready for its first `reset`
    fn create_command_list(
        &self,
        device: &Self::Device,
        allocator: &Self::Allocator,
    ) -> GpuResult<Self::CommandList>;

    /// Starts at 0
    fn create_fence(&self, device: &Self::Device) -> GpuResult<Self::Fence>;

    fn create_swap_chain(
        &self,
        device: &Self::Device,
        queue: &Self::Queue,
        window: WindowHandle,
        desc: &SwapChainDesc,
    ) -> GpuResult<Self::SwapChain>;

    /// Render target view for back buffer `index`, placed in `heap`
    fn create_render_target(
        &self,
        device: &Self::Device,
        swap_chain: &Self::SwapChain,
        heap: &Self::DescriptorHeap,
        index: usize,
    ) -> GpuResult<Self::RenderTarget>;
}
