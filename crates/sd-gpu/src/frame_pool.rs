//! Frames in flight
//!
//! Each slot owns a command allocator and the fence value signaled after
//! its last submission. A slot is reused only after the GPU passed that
//! value; zero means nothing is pending.

use crate::{CommandAllocator, GpuBackend, GpuFence, GpuResult};

pub struct FrameResources<B: GpuBackend> {
    allocator: B::Allocator,
    fence_value: u64,
}

impl<B: GpuBackend> FrameResources<B> {
    #[inline]
    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    #[inline]
    pub fn allocator_mut(&mut self) -> &mut B::Allocator {
        &mut self.allocator
    }

    /// Record the fence value that guards this frame's submission
    #[inline]
    pub fn mark_submitted(&mut self, fence_value: u64) {
        self.fence_value = fence_value;
    }
}

pub struct FramePool<B: GpuBackend> {
    frames: Vec<FrameResources<B>>,
}

impl<B: GpuBackend> FramePool<B> {
    pub fn new(backend: &B, device: &B::Device, count: usize) -> GpuResult<Self> {
        let frames = (0..count.max(1))
            .map(|_| {
                Ok(FrameResources {
                    allocator: backend.create_command_allocator(device)?,
                    fence_value: 0,
                })
            })
            .collect::<GpuResult<Vec<_>>>()?;

        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn slot_for(&self, frame_index: u64) -> usize {
        (frame_index % self.frames.len() as u64) as usize
    }

    pub fn first_allocator(&self) -> &B::Allocator {
        &self.frames[0].allocator
    }

    pub fn frame(&self, slot: usize) -> Option<&FrameResources<B>> {
        self.frames.get(slot)
    }

    /// Claim the slot for `frame_index`, waiting out its previous submission.
    ///
    /// The allocator is reset before returning. A failed wait leaves the
    /// slot's fence value in place.
    pub fn acquire(
        &mut self,
        fence: &B::Fence,
        frame_index: u64,
    ) -> GpuResult<&mut FrameResources<B>> {
        let slot = self.slot_for(frame_index);
        let frame = &mut self.frames[slot];

        let pending = frame.fence_value;
        if pending != 0 {
            if fence.completed_value() < pending {
                log::trace!("Frame slot {} waiting on fence {}", slot, pending);
                fence.wait_for(pending)?;
            }
            frame.fence_value = 0;
        }

        frame.allocator.reset()?;
        Ok(frame)
    }

    /// Wait until the GPU reached `last_signaled`, then mark every slot free.
    ///
    /// The queue is in-order, so the newest value covers all older ones.
    pub fn wait_until_idle(&mut self, fence: &B::Fence, last_signaled: u64) -> GpuResult<()> {
        if self.is_idle() {
            return Ok(());
        }

        if fence.completed_value() < last_signaled {
            fence.wait_for(last_signaled)?;
        }

        for frame in &mut self.frames {
            frame.fence_value = 0;
        }
        Ok(())
    }

    /// True when no slot has outstanding GPU work
    pub fn is_idle(&self) -> bool {
        self.frames.iter().all(|f| f.fence_value == 0)
    }
}
