//! Windowing APIs and the editor's child window
//!
//! The editor renders into a child window it creates itself; the host later
//! supplies a parent to embed it in.

use sd_gpu::WindowHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowApi {
    Win32,
    Cocoa,
    X11,
}

impl WindowApi {
    /// Parse a host-provided API name ("win32", "cocoa", "x11")
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "win32" => Some(Self::Win32),
            "cocoa" => Some(Self::Cocoa),
            "x11" => Some(Self::X11),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Win32 => "win32",
            Self::Cocoa => "cocoa",
            Self::X11 => "x11",
        }
    }

    /// The only API embeddable on this platform
    pub fn native() -> Option<Self> {
        if cfg!(target_os = "windows") {
            Some(Self::Win32)
        } else if cfg!(target_os = "macos") {
            Some(Self::Cocoa)
        } else if cfg!(target_os = "linux") {
            Some(Self::X11)
        } else {
            None
        }
    }
}

/// Creates, embeds and destroys the editor's child window
pub trait WindowHost {
    fn create_child(&mut self, api: WindowApi, width: u32, height: u32) -> Option<WindowHandle>;
    fn reparent(&mut self, child: WindowHandle, parent: WindowHandle) -> bool;
    fn destroy_child(&mut self, child: WindowHandle);
}

/// Window host without native windows
#[derive(Debug, Default)]
pub struct HeadlessWindows {
    next_id: u64,
    children: Vec<(WindowHandle, Option<WindowHandle>)>,
}

impl HeadlessWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_children(&self) -> usize {
        self.children.len()
    }

    pub fn parent_of(&self, child: WindowHandle) -> Option<WindowHandle> {
        self.children
            .iter()
            .find(|(c, _)| *c == child)
            .and_then(|(_, parent)| *parent)
    }
}

impl WindowHost for HeadlessWindows {
    fn create_child(&mut self, _api: WindowApi, _width: u32, _height: u32) -> Option<WindowHandle> {
        self.next_id += 1;
        let child = WindowHandle::Headless { id: self.next_id };
        self.children.push((child, None));
        Some(child)
    }

    fn reparent(&mut self, child: WindowHandle, parent: WindowHandle) -> bool {
        match self.children.iter_mut().find(|(c, _)| *c == child) {
            Some(entry) => {
                entry.1 = Some(parent);
                true
            }
            None => false,
        }
    }

    fn destroy_child(&mut self, child: WindowHandle) {
        self.children.retain(|(c, _)| *c != child);
    }
}
