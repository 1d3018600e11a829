//! Presentation surface
//!
//! One per editor window. Owns the swap chain, its render targets, the
//! command queue and the frames-in-flight pool, and holds a lease on the
//! shared device.
//!
//! Frame protocol:
//! 1. Advance the frame index, wait on the swap chain's latency waitable
//! 2. Claim the frame slot (fence wait if its last submission is pending)
//! 3. Record: PRESENT → RENDER_TARGET, clear, draw, RENDER_TARGET → PRESENT
//! 4. Execute, present, signal `last + 1` and store it on the slot

use std::sync::Arc;

use sd_core::EditorConfig;

use crate::{
    CommandQueue, CommandRecorder, DeviceLease, DeviceRegistry, DrawList, FramePool, GpuBackend,
    GpuError, GpuResult, HeapKind, ResourceState, SwapChain, SwapChainDesc, WindowHandle,
};

/// Surface parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceConfig {
    pub frames_in_flight: usize,
    pub back_buffers: usize,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub clear_color: [f32; 4],
    pub debug_layer: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for SurfaceConfig {
    fn from(config: &EditorConfig) -> Self {
        Self {
            frames_in_flight: config.frames_in_flight,
            back_buffers: config.back_buffers,
            width: config.width,
            height: config.height,
            vsync: config.vsync,
            clear_color: config.clear_color,
            debug_layer: config.debug_layer,
        }
    }
}

/// What one `render_frame` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub frame_slot: usize,
    pub back_buffer: usize,
    pub fence_value: u64,
    pub draw_commands: usize,
}

pub struct PresentationSurface<B: GpuBackend> {
    // Declaration order is release order: views before the swap chain,
    // everything before the heaps, the device lease last.
    render_targets: Vec<B::RenderTarget>,
    swap_chain: B::SwapChain,
    fence: B::Fence,
    command_list: B::CommandList,
    frames: FramePool<B>,
    queue: B::Queue,
    srv_heap: B::DescriptorHeap,
    rtv_heap: B::DescriptorHeap,
    lease: DeviceLease<B>,

    window: WindowHandle,
    config: SurfaceConfig,
    frame_index: u64,
    last_signaled: u64,
    draw_list: DrawList,
}

impl<B: GpuBackend> PresentationSurface<B> {
    /// Build every per-window resource.
    ///
    /// Partially created resources are released on failure, including the
    /// device reference.
    pub fn create(
        registry: &Arc<DeviceRegistry<B>>,
        window: WindowHandle,
        config: SurfaceConfig,
    ) -> GpuResult<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(GpuError::InvalidSize {
                width: config.width,
                height: config.height,
            });
        }

        let lease = registry.retain(config.debug_layer)?;
        let backend = lease.backend();
        let device = lease.device();

        let rtv_heap =
            backend.create_descriptor_heap(device, HeapKind::RenderTargetViews, config.back_buffers)?;
        let srv_heap = backend.create_descriptor_heap(device, HeapKind::ShaderResources, 1)?;
        let queue = backend.create_command_queue(device)?;
        let frames = FramePool::new(backend, device, config.frames_in_flight)?;
        let command_list = backend.create_command_list(device, frames.first_allocator())?;
        let fence = backend.create_fence(device)?;

        let desc = SwapChainDesc {
            buffer_count: config.back_buffers,
            width: config.width,
            height: config.height,
            max_frame_latency: config.back_buffers,
            vsync: config.vsync,
        };
        let swap_chain = backend.create_swap_chain(device, &queue, window, &desc)?;
        let render_targets = create_render_targets(backend, device, &swap_chain, &rtv_heap)?;

        log::info!(
            "Surface created for {:?}: {}x{}, {} back buffers, {} frames in flight",
            window,
            config.width,
            config.height,
            config.back_buffers,
            frames.len()
        );

        Ok(Self {
            render_targets,
            swap_chain,
            fence,
            command_list,
            frames,
            queue,
            srv_heap,
            rtv_heap,
            lease,
            window,
            config,
            frame_index: 0,
            last_signaled: 0,
            draw_list: DrawList::new(config.width, config.height),
        })
    }

    pub fn window(&self) -> WindowHandle {
        self.window
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn size(&self) -> (u32, u32) {
        self.swap_chain.size()
    }

    pub fn back_buffer_count(&self) -> usize {
        self.swap_chain.buffer_count()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Value signaled after the most recent submission
    pub fn last_signaled(&self) -> u64 {
        self.last_signaled
    }

    pub fn frames(&self) -> &FramePool<B> {
        &self.frames
    }

    pub fn device(&self) -> &B::Device {
        self.lease.device()
    }

    pub fn shader_heap(&self) -> &B::DescriptorHeap {
        &self.srv_heap
    }

    /// Record, submit and present one frame.
    ///
    /// `draw` fills the frame's draw list before any GPU work is queued.
    pub fn render_frame(&mut self, draw: impl FnOnce(&mut DrawList)) -> GpuResult<FrameReport> {
        let (width, height) = self.swap_chain.size();
        self.draw_list.begin(width, height);
        draw(&mut self.draw_list);

        self.frame_index += 1;
        let frame_index = self.frame_index;
        let frame_slot = self.frames.slot_for(frame_index);

        self.swap_chain.wait_frame_latency()?;
        let frame = self.frames.acquire(&self.fence, frame_index)?;

        let back_buffer = self.swap_chain.current_back_buffer()?;
        let target = self.render_targets.get(back_buffer).ok_or_else(|| {
            GpuError::Surface(format!(
                "back buffer {} out of range ({} targets)",
                back_buffer,
                self.render_targets.len()
            ))
        })?;

        let list = &mut self.command_list;
        list.reset(frame.allocator_mut())?;
        list.transition(target, ResourceState::Present, ResourceState::RenderTarget);
        list.clear(target, self.config.clear_color);
        list.bind_target(target);
        list.draw(&self.draw_list);
        list.transition(target, ResourceState::RenderTarget, ResourceState::Present);
        list.close()?;

        self.queue.execute(list)?;
        let presented = self.swap_chain.present(if self.config.vsync { 1 } else { 0 });

        // Executed work is fenced even when present or signal failed, so the
        // slot is never reset under it
        let fence_value = self.last_signaled + 1;
        let signaled = self.queue.signal(&self.fence, fence_value);
        self.last_signaled = fence_value;
        frame.mark_submitted(fence_value);
        presented?;
        signaled?;

        Ok(FrameReport {
            frame_index,
            frame_slot,
            back_buffer,
            fence_value,
            draw_commands: self.draw_list.len(),
        })
    }

    /// Block until the GPU finished the most recent frame
    pub fn wait_for_last_submitted(&mut self) -> GpuResult<()> {
        self.frames.wait_until_idle(&self.fence, self.last_signaled)
    }

    /// Resize the swap chain buffers, keeping the buffer count.
    ///
    /// Zero dimensions (minimized window) are rejected without touching
    /// anything.
    pub fn resize(&mut self, width: u32, height: u32) -> GpuResult<()> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidSize { width, height });
        }

        self.wait_for_last_submitted()?;
        self.render_targets.clear();
        self.swap_chain.resize_buffers(width, height)?;
        self.render_targets = create_render_targets(
            self.lease.backend(),
            self.lease.device(),
            &self.swap_chain,
            &self.rtv_heap,
        )?;

        self.config.width = width;
        self.config.height = height;
        log::debug!("Surface resized to {}x{}", width, height);
        Ok(())
    }

    /// Quiesce the GPU and release every resource.
    ///
    /// Resources are released even when the wait fails; the error is
    /// still reported.
    pub fn destroy(mut self) -> GpuResult<()> {
        let result = self.wait_for_last_submitted();
        drop(self);
        result
    }
}

impl<B: GpuBackend> Drop for PresentationSurface<B> {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_last_submitted() {
            log::error!("Surface released with GPU work outstanding: {}", e);
        }
        log::debug!("Surface for {:?} released", self.window);
    }
}

fn create_render_targets<B: GpuBackend>(
    backend: &B,
    device: &B::Device,
    swap_chain: &B::SwapChain,
    heap: &B::DescriptorHeap,
) -> GpuResult<Vec<B::RenderTarget>> {
    (0..swap_chain.buffer_count())
        .map(|index| backend.create_render_target(device, swap_chain, heap, index))
        .collect()
}
