/// Backend contract, implemented once per graphics API
///
/// The renderer owns the backend and issues every GPU call through it. API
/// objects passed to the backend were created by its own factory, so a
/// backend may downcast them (`ApiRenderObject::into_any`) to reach native
/// state.

use std::sync::Arc;
use bitflags::bitflags;
use glam::{Mat4, Vec4};
use crate::config::RendererConfig;
use crate::error::Result;
use crate::render_object::{AttachmentKind, DrawBuffer, FrameBufferAttachment};
use crate::renderer::RenderArea;
use super::api_object::ApiRenderObject;
use super::object_cache::ApiObjectFactory;

/// Shared handle on an API object
pub type ApiObjectRef = Arc<dyn ApiRenderObject>;

/// GPU vendor, used for vendor-specific feature gating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Other,
}

/// Features reported by a backend after initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    pub vendor: GpuVendor,
    /// Layered (multiview) rendering supported without explicit layer attachment
    pub native_multiview: bool,
    pub max_color_attachments: u8,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            vendor: GpuVendor::Other,
            native_multiview: false,
            max_color_attachments: 8,
        }
    }
}

/// Framebuffer binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameBufferBindTarget {
    ReadFramebuffer,
    DrawFramebuffer,
    Framebuffer,
}

/// Color buffer read by a blit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadBufferMode {
    None,
    Front,
    Back,
    ColorAttachment(u8),
}

bitflags! {
    /// Buffers copied by a blit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlitMask: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

bitflags! {
    /// Memory barrier bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryBarrierMask: u32 {
        const VERTEX_ATTRIB_ARRAY = 1 << 0;
        const ELEMENT_ARRAY = 1 << 1;
        const UNIFORM = 1 << 2;
        const TEXTURE_FETCH = 1 << 3;
        const SHADER_IMAGE_ACCESS = 1 << 5;
        const COMMAND = 1 << 6;
        const PIXEL_BUFFER = 1 << 7;
        const TEXTURE_UPDATE = 1 << 8;
        const BUFFER_UPDATE = 1 << 9;
        const FRAMEBUFFER = 1 << 10;
        const SHADER_STORAGE = 1 << 13;
        const ALL = u32::MAX;
    }
}

/// Framebuffer-to-framebuffer copy (None = default framebuffer)
#[derive(Clone)]
pub struct BlitRequest {
    pub source: Option<ApiObjectRef>,
    pub destination: Option<ApiObjectRef>,
    pub source_area: RenderArea,
    pub destination_area: RenderArea,
    pub read_buffer: ReadBufferMode,
    pub mask: BlitMask,
    pub linear_filter: bool,
}

/// RGBA8 readback result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelData {
    pub width: u32,
    pub height: u32,
    /// Row-major, 4 bytes per pixel
    pub rgba: Vec<u8>,
}

impl PixelData {
    /// Pixels as RGBA quadruplets; None if `rgba` isn't a whole number of pixels
    pub fn pixels(&self) -> Option<&[[u8; 4]]> {
        bytemuck::try_cast_slice(&self.rgba).ok()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels()?.get((y * self.width + x) as usize).copied()
    }
}

pub type PixelCallback = Box<dyn FnOnce(Result<PixelData>) + Send>;
pub type DepthCallback = Box<dyn FnOnce(Result<f32>) + Send>;

/// Graphics API backend
pub trait RenderBackend: Send {
    fn name(&self) -> &str;

    /// Valid after `initialize`
    fn capabilities(&self) -> BackendCapabilities;

    fn initialize(&mut self, config: &RendererConfig) -> Result<()>;

    fn clean_up(&mut self);

    /// Factory the renderer's object cache creates wrappers with
    fn object_factory(&self) -> Arc<dyn ApiObjectFactory>;

    fn set_viewport(&mut self, area: RenderArea);

    /// None disables the scissor test
    fn set_scissor(&mut self, area: Option<RenderArea>);

    fn set_clear_color(&mut self, color: Vec4);

    fn clear(&mut self, color: bool, depth: bool, stencil: bool);

    /// None binds the default framebuffer
    fn bind_frame_buffer(&mut self, target: FrameBufferBindTarget, frame_buffer: Option<&ApiObjectRef>);

    fn set_draw_buffers(&mut self, frame_buffer: &ApiObjectRef, draw_buffers: &[DrawBuffer]);

    fn attach(
        &mut self,
        frame_buffer: &ApiObjectRef,
        attachment: FrameBufferAttachment,
        target: &ApiObjectRef,
        kind: AttachmentKind,
    );

    fn detach(&mut self, frame_buffer: &ApiObjectRef, attachment: FrameBufferAttachment, kind: AttachmentKind);

    fn blit(&mut self, request: &BlitRequest);

    fn dispatch_compute(&mut self, program: &ApiObjectRef, groups_x: u32, groups_y: u32, groups_z: u32);

    fn memory_barrier(&mut self, mask: MemoryBarrierMask);

    fn draw_mesh(&mut self, mesh: &ApiObjectRef, material: &ApiObjectRef, world: &Mat4, instances: u32);

    fn draw_full_screen_quad(&mut self, material: &ApiObjectRef);

    /// Read back an area of the bound read framebuffer; callback may run later
    fn read_pixels(&mut self, area: RenderArea, callback: PixelCallback);

    /// Read back one depth value; callback may run later
    fn read_depth(&mut self, x: u32, y: u32, callback: DepthCallback);
}
