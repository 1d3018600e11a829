//! Native backend on wgpu
//!
//! wgpu tracks resource states and recycles command memory itself, so
//! transitions and allocator resets are no-ops here. Fences map signaled
//! values onto submission indices and complete through
//! `on_submitted_work_done`.

use std::collections::VecDeque;
use std::num::NonZeroIsize;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use raw_window_handle::{
    AppKitDisplayHandle, AppKitWindowHandle, DisplayHandle, HandleError, HasDisplayHandle,
    HasWindowHandle, RawDisplayHandle, RawWindowHandle, Win32WindowHandle, WindowsDisplayHandle,
    XlibDisplayHandle, XlibWindowHandle,
};
use wgpu::util::DeviceExt;

use crate::{
    CommandAllocator, CommandQueue, CommandRecorder, DeviceRegistry, DrawList, GpuBackend,
    GpuError, GpuFence, GpuResult, HeapKind, ResourceState, SwapChain, SwapChainDesc, Vertex,
    WindowHandle,
};

const QUAD_SHADER: &str = r#"
struct VertexOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec4<f32>) -> VertexOut {
    var out: VertexOut;
    out.position = vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];

static SHARED_REGISTRY: OnceLock<Arc<DeviceRegistry<WgpuBackend>>> = OnceLock::new();

#[derive(Debug, Default, Clone, Copy)]
pub struct WgpuBackend;

impl WgpuBackend {
    /// Registry shared by every editor window in the process
    pub fn shared_registry() -> Arc<DeviceRegistry<WgpuBackend>> {
        DeviceRegistry::global(&SHARED_REGISTRY, || WgpuBackend)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOURCES
// ═══════════════════════════════════════════════════════════════════════════════

pub struct WgpuDevice {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

/// wgpu binds views directly; the heap only records its capacity
pub struct WgpuDescriptorHeap {
    pub kind: HeapKind,
    pub capacity: usize,
}

pub struct WgpuQueue {
    queue: wgpu::Queue,
    last_submission: Option<wgpu::SubmissionIndex>,
}

pub struct WgpuAllocator;

pub struct WgpuFence {
    device: wgpu::Device,
    completed: Arc<AtomicU64>,
    submissions: Mutex<VecDeque<(u64, wgpu::SubmissionIndex)>>,
}

type ViewSlot = Arc<Mutex<Option<(wgpu::TextureView, wgpu::TextureFormat)>>>;

pub struct WgpuRenderTarget {
    slot: ViewSlot,
}

pub struct WgpuSwapChain {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    config: wgpu::SurfaceConfiguration,
    buffer_count: usize,
    slots: Vec<ViewSlot>,
    next: usize,
    current: Option<wgpu::SurfaceTexture>,
}

pub struct WgpuCommandList {
    device: wgpu::Device,
    encoder: Option<wgpu::CommandEncoder>,
    finished: Option<wgpu::CommandBuffer>,
    target: Option<(wgpu::TextureView, wgpu::TextureFormat)>,
    clear: wgpu::Color,
    vertices: Vec<Vertex>,
    pipeline: Option<(wgpu::TextureFormat, wgpu::RenderPipeline)>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRAIT IMPLEMENTATIONS
// ═══════════════════════════════════════════════════════════════════════════════

impl GpuFence for WgpuFence {
    fn completed_value(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    fn wait_for(&self, value: u64) -> GpuResult<()> {
        if self.completed_value() >= value {
            return Ok(());
        }

        let index = {
            let submissions = self.submissions.lock();
            submissions
                .iter()
                .find(|(v, _)| *v >= value)
                .map(|(_, index)| index.clone())
        };
        let index = index.ok_or_else(|| {
            GpuError::DeviceLost(format!("fence value {} was never signaled", value))
        })?;

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(index),
                timeout: None,
            })
            .map_err(|e| GpuError::DeviceLost(e.to_string()))?;

        self.completed.fetch_max(value, Ordering::AcqRel);
        self.submissions.lock().retain(|(v, _)| *v > value);
        Ok(())
    }
}

impl CommandAllocator for WgpuAllocator {
    fn reset(&mut self) -> GpuResult<()> {
        Ok(())
    }
}

impl CommandRecorder for WgpuCommandList {
    type Allocator = WgpuAllocator;
    type Target = WgpuRenderTarget;

    fn reset(&mut self, _allocator: &mut WgpuAllocator) -> GpuResult<()> {
        self.encoder = Some(self.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor {
                label: Some("Editor Frame Encoder"),
            },
        ));
        self.finished = None;
        self.target = None;
        self.vertices.clear();
        Ok(())
    }

    fn transition(&mut self, _target: &WgpuRenderTarget, before: ResourceState, after: ResourceState) {
        log::trace!("wgpu transition {:?} -> {:?} (implicit)", before, after);
    }

    fn clear(&mut self, _target: &WgpuRenderTarget, color: [f32; 4]) {
        self.clear = wgpu::Color {
            r: color[0] as f64,
            g: color[1] as f64,
            b: color[2] as f64,
            a: color[3] as f64,
        };
    }

    fn bind_target(&mut self, target: &WgpuRenderTarget) {
        self.target = target.slot.lock().clone();
    }

    fn draw(&mut self, list: &DrawList) {
        self.vertices = list.vertices();
    }

    fn close(&mut self) -> GpuResult<()> {
        let mut encoder = self
            .encoder
            .take()
            .ok_or_else(|| GpuError::Backend("command list closed twice".into()))?;
        let (view, format) = self
            .target
            .take()
            .ok_or_else(|| GpuError::Backend("no render target bound".into()))?;

        let vertex_buffer = (!self.vertices.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Editor Quad Vertices"),
                    contents: bytemuck::cast_slice(&self.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });
        let pipeline = self.pipeline_for(format);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Editor Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });

            if let Some(buffer) = &vertex_buffer {
                render_pass.set_pipeline(&pipeline);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..self.vertices.len() as u32, 0..1);
            }
        }

        self.finished = Some(encoder.finish());
        Ok(())
    }
}

impl WgpuCommandList {
    fn pipeline_for(&mut self, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
        if let Some((cached, pipeline)) = &self.pipeline {
            if *cached == format {
                return pipeline.clone();
            }
        }

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Editor Quad Shader"),
                source: wgpu::ShaderSource::Wgsl(QUAD_SHADER.into()),
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Editor Quad Pipeline"),
                layout: None,
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &VERTEX_ATTRIBUTES,
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        self.pipeline = Some((format, pipeline.clone()));
        pipeline
    }
}

impl CommandQueue for WgpuQueue {
    type CommandList = WgpuCommandList;
    type Fence = WgpuFence;

    fn execute(&mut self, list: &mut WgpuCommandList) -> GpuResult<()> {
        let buffer = list
            .finished
            .take()
            .ok_or_else(|| GpuError::Backend("executed an open command list".into()))?;
        self.last_submission = Some(self.queue.submit(Some(buffer)));
        Ok(())
    }

    fn signal(&mut self, fence: &WgpuFence, value: u64) -> GpuResult<()> {
        let index = self
            .last_submission
            .take()
            .unwrap_or_else(|| self.queue.submit(std::iter::empty()));
        fence.submissions.lock().push_back((value, index));

        let completed = Arc::clone(&fence.completed);
        self.queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });
        Ok(())
    }
}

impl SwapChain for WgpuSwapChain {
    fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn wait_frame_latency(&mut self) -> GpuResult<()> {
        // Frame latency is enforced inside get_current_texture
        Ok(())
    }

    fn current_back_buffer(&mut self) -> GpuResult<usize> {
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                self.surface
                    .get_current_texture()
                    .map_err(|e| GpuError::Surface(e.to_string()))?
            }
            Err(e) => return Err(GpuError::Surface(e.to_string())),
        };

        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let index = self.next % self.buffer_count;
        self.next = self.next.wrapping_add(1);

        *self.slots[index].lock() = Some((view, self.config.format));
        self.current = Some(texture);
        Ok(index)
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> GpuResult<()> {
        self.current = None;
        for slot in &self.slots {
            *slot.lock() = None;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.next = 0;
        Ok(())
    }

    fn present(&mut self, _sync_interval: u32) -> GpuResult<()> {
        let texture = self
            .current
            .take()
            .ok_or_else(|| GpuError::Surface("present without an acquired back buffer".into()))?;
        texture.present();
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

impl GpuBackend for WgpuBackend {
    type Device = WgpuDevice;
    type DescriptorHeap = WgpuDescriptorHeap;
    type Queue = WgpuQueue;
    type Allocator = WgpuAllocator;
    type CommandList = WgpuCommandList;
    type Fence = WgpuFence;
    type SwapChain = WgpuSwapChain;
    type RenderTarget = WgpuRenderTarget;

    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn create_device(&self, debug_layer: bool) -> GpuResult<WgpuDevice> {
        let flags = if debug_layer {
            wgpu::InstanceFlags::debugging()
        } else {
            wgpu::InstanceFlags::empty()
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| GpuError::creation("adapter", e))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using GPU: {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Saw Demo Editor Device"),
            ..Default::default()
        }))
        .map_err(|e| GpuError::creation("device", e))?;

        Ok(WgpuDevice {
            instance,
            adapter,
            device,
            queue,
            adapter_info,
        })
    }

    fn create_descriptor_heap(
        &self,
        _device: &WgpuDevice,
        kind: HeapKind,
        count: usize,
    ) -> GpuResult<WgpuDescriptorHeap> {
        Ok(WgpuDescriptorHeap {
            kind,
            capacity: count,
        })
    }

    fn create_command_queue(&self, device: &WgpuDevice) -> GpuResult<WgpuQueue> {
        Ok(WgpuQueue {
            queue: device.queue.clone(),
            last_submission: None,
        })
    }

    fn create_command_allocator(&self, _device: &WgpuDevice) -> GpuResult<WgpuAllocator> {
        Ok(WgpuAllocator)
    }

    fn create_command_list(
        &self,
        device: &WgpuDevice,
        _allocator: &WgpuAllocator,
    ) -> GpuResult<WgpuCommandList> {
        Ok(WgpuCommandList {
            device: device.device.clone(),
            encoder: None,
            finished: None,
            target: None,
            clear: wgpu::Color::BLACK,
            vertices: Vec::new(),
            pipeline: None,
        })
    }

    fn create_fence(&self, device: &WgpuDevice) -> GpuResult<WgpuFence> {
        Ok(WgpuFence {
            device: device.device.clone(),
            completed: Arc::new(AtomicU64::new(0)),
            submissions: Mutex::new(VecDeque::new()),
        })
    }

    fn create_swap_chain(
        &self,
        device: &WgpuDevice,
        _queue: &WgpuQueue,
        window: WindowHandle,
        desc: &SwapChainDesc,
    ) -> GpuResult<WgpuSwapChain> {
        let native = NativeWindow::new(window)?;
        // SAFETY: the host keeps the parent window alive until the editor is destroyed,
        // and the surface is released before that in the surface teardown
        let surface = unsafe {
            let target = wgpu::SurfaceTargetUnsafe::from_window(&native)
                .map_err(|e| GpuError::creation("surface", e))?;
            device
                .instance
                .create_surface_unsafe(target)
                .map_err(|e| GpuError::creation("surface", e))?
        };

        let mut config = surface
            .get_default_config(&device.adapter, desc.width, desc.height)
            .ok_or_else(|| GpuError::creation("swap chain", "surface unsupported by adapter"))?;
        config.present_mode = if desc.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        config.desired_maximum_frame_latency = desc.max_frame_latency as u32;
        surface.configure(&device.device, &config);

        Ok(WgpuSwapChain {
            surface,
            device: device.device.clone(),
            config,
            buffer_count: desc.buffer_count,
            slots: (0..desc.buffer_count)
                .map(|_| Arc::new(Mutex::new(None)))
                .collect(),
            next: 0,
            current: None,
        })
    }

    fn create_render_target(
        &self,
        _device: &WgpuDevice,
        swap_chain: &WgpuSwapChain,
        _heap: &WgpuDescriptorHeap,
        index: usize,
    ) -> GpuResult<WgpuRenderTarget> {
        let slot = swap_chain.slots.get(index).ok_or_else(|| {
            GpuError::creation("render target", format!("back buffer {} out of range", index))
        })?;
        Ok(WgpuRenderTarget {
            slot: Arc::clone(slot),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NATIVE WINDOW HANDLES
// ═══════════════════════════════════════════════════════════════════════════════

struct NativeWindow {
    window: RawWindowHandle,
    display: RawDisplayHandle,
}

impl NativeWindow {
    fn new(handle: WindowHandle) -> GpuResult<Self> {
        let invalid = || GpuError::creation("surface", format!("invalid window handle {:?}", handle));

        let (window, display) = match handle {
            WindowHandle::Win32 { hwnd } => {
                let hwnd = NonZeroIsize::new(hwnd).ok_or_else(invalid)?;
                (
                    RawWindowHandle::Win32(Win32WindowHandle::new(hwnd)),
                    RawDisplayHandle::Windows(WindowsDisplayHandle::new()),
                )
            }
            WindowHandle::Cocoa { ns_view } => {
                let view = NonNull::new(ns_view as *mut std::ffi::c_void).ok_or_else(invalid)?;
                (
                    RawWindowHandle::AppKit(AppKitWindowHandle::new(view)),
                    RawDisplayHandle::AppKit(AppKitDisplayHandle::new()),
                )
            }
            WindowHandle::X11 { window } => (
                RawWindowHandle::Xlib(XlibWindowHandle::new(window as _)),
                RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
            ),
            WindowHandle::Headless { .. } => return Err(invalid()),
        };

        Ok(Self { window, display })
    }
}

impl HasWindowHandle for NativeWindow {
    fn window_handle(&self) -> Result<raw_window_handle::WindowHandle<'_>, HandleError> {
        // SAFETY: the handle stays valid for the surface's lifetime (see create_swap_chain)
        Ok(unsafe { raw_window_handle::WindowHandle::borrow_raw(self.window) })
    }
}

impl HasDisplayHandle for NativeWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        // SAFETY: display handles carry no ownership
        Ok(unsafe { DisplayHandle::borrow_raw(self.display) })
    }
}
