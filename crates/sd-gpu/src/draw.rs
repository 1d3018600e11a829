//! Retained draw list for one frame
//!
//! The view fills a [`DrawList`] in pixel coordinates; backends consume it
//! either as commands (headless) or as a triangle list ([`DrawList::vertices`]).

/// Color in linear sRGB (for GPU)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// From hex color (e.g., 0x4A9EFF)
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const PANEL: Self = Self::new(0.16, 0.18, 0.20, 1.0);
    pub const TRACK: Self = Self::new(0.08, 0.09, 0.10, 1.0);
    pub const ACCENT: Self = Self::new(0.290, 0.620, 1.0, 1.0); // #4A9EFF
    pub const ACTIVE: Self = Self::new(1.0, 0.565, 0.251, 1.0); // #FF9040
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Axis-aligned rectangle in pixels, origin top-left
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    /// Shrink on every side
    pub fn inset(&self, by: f32) -> Self {
        Self::new(
            self.x + by,
            self.y + by,
            (self.w - 2.0 * by).max(0.0),
            (self.h - 2.0 * by).max(0.0),
        )
    }

    /// Left part covering `fraction` (0..=1) of the width
    pub fn left_fraction(&self, fraction: f32) -> Self {
        Self::new(self.x, self.y, self.w * fraction.clamp(0.0, 1.0), self.h)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawCmd {
    FillRect { rect: Rect, color: Color },
}

/// Vertex for the quad pipeline (NDC position + color)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

#[derive(Debug, Default)]
pub struct DrawList {
    width: u32,
    height: u32,
    commands: Vec<DrawCmd>,
}

impl DrawList {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::with_capacity(64),
        }
    }

    /// Start a new frame, keeping the allocation
    pub fn begin(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.clear();
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        if rect.w > 0.0 && rect.h > 0.0 {
            self.commands.push(DrawCmd::FillRect { rect, color });
        }
    }

    pub fn commands(&self) -> &[DrawCmd] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Triangle list in normalized device coordinates, six vertices per rect
    pub fn vertices(&self) -> Vec<Vertex> {
        let mut out = Vec::with_capacity(self.commands.len() * 6);
        if self.width == 0 || self.height == 0 {
            return out;
        }

        let sx = 2.0 / self.width as f32;
        let sy = 2.0 / self.height as f32;

        for cmd in &self.commands {
            let DrawCmd::FillRect { rect, color } = cmd;
            let x0 = rect.x * sx - 1.0;
            let x1 = (rect.x + rect.w) * sx - 1.0;
            let y0 = 1.0 - rect.y * sy;
            let y1 = 1.0 - (rect.y + rect.h) * sy;
            let color = color.to_array();

            for position in [[x0, y0], [x1, y0], [x0, y1], [x0, y1], [x1, y0], [x1, y1]] {
                out.push(Vertex { position, color });
            }
        }

        out
    }
}
