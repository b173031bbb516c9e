/// Generic texture description and resize policy

use std::sync::{Arc, PoisonError, RwLock};
use glam::UVec2;
use super::generic_object::{GenericEvent, GenericRenderObject};

/// Texture pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    S8_UINT,
}

impl TextureFormat {
    /// Format carries a depth component
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::D32_SFLOAT | TextureFormat::D24_UNORM_S8_UINT)
    }

    /// Format carries a stencil component
    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT | TextureFormat::S8_UINT)
    }

    /// Color format (neither depth nor stencil)
    pub fn is_color(&self) -> bool {
        !self.is_depth() && !self.has_stencil()
    }
}

/// Texture variant
#[derive(Debug, Clone)]
pub enum TextureKind {
    Texture2D,
    Texture2DArray { layers: u32 },
    TextureCube,
    Texture3D { depth: u32 },
    /// Renderable storage that can't be sampled
    RenderBuffer,
    /// View on a range of layers of another texture; sized by its source
    View {
        source: Arc<GenericRenderObject>,
        base_layer: u32,
        layer_count: u32,
    },
}

/// Texture creation parameters
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub kind: TextureKind,
    pub format: TextureFormat,
    pub mip_levels: u32,
    /// Storage may be reallocated in place by `resize_texture`
    pub resizable: bool,
}

impl TextureDesc {
    /// Single-mip resizable 2D texture
    pub fn texture_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            kind: TextureKind::Texture2D,
            format,
            mip_levels: 1,
            resizable: true,
        }
    }

    /// Resizable render buffer
    pub fn render_buffer(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            kind: TextureKind::RenderBuffer,
            ..Self::texture_2d(width, height, format)
        }
    }

    /// Resizable 2D array texture
    pub fn texture_2d_array(width: u32, height: u32, layers: u32, format: TextureFormat) -> Self {
        Self {
            kind: TextureKind::Texture2DArray { layers: layers.max(1) },
            ..Self::texture_2d(width, height, format)
        }
    }

    /// Cube map (fixed size)
    pub fn texture_cube(size: u32, format: TextureFormat) -> Self {
        Self {
            kind: TextureKind::TextureCube,
            resizable: false,
            ..Self::texture_2d(size, size, format)
        }
    }

    /// View on `layer_count` layers of `source`, starting at `base_layer`
    pub fn view(source: Arc<GenericRenderObject>, base_layer: u32, layer_count: u32) -> Self {
        let (size, format) = source
            .as_texture()
            .map(|texture| (texture.size(), texture.format()))
            .unwrap_or((UVec2::ONE, TextureFormat::R8G8B8A8_UNORM));
        Self {
            width: size.x,
            height: size.y,
            kind: TextureKind::View { source, base_layer, layer_count },
            format,
            mip_levels: 1,
            resizable: false,
        }
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels.max(1);
        self
    }

    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }
}

/// Generic texture
#[derive(Debug)]
pub struct Texture {
    kind: TextureKind,
    format: TextureFormat,
    mip_levels: u32,
    resizable: bool,
    size: RwLock<UVec2>,
}

impl Texture {
    pub fn new(desc: TextureDesc) -> Self {
        Self {
            kind: desc.kind,
            format: desc.format,
            mip_levels: desc.mip_levels.max(1),
            resizable: desc.resizable,
            size: RwLock::new(UVec2::new(desc.width.max(1), desc.height.max(1))),
        }
    }

    pub fn kind(&self) -> &TextureKind {
        &self.kind
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    /// Current size of mip 0 (views report their source's size)
    pub fn size(&self) -> UVec2 {
        if let TextureKind::View { source, .. } = &self.kind {
            if let Some(texture) = source.as_texture() {
                return texture.size();
            }
        }
        *self.size.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Size of a given mip level
    pub fn mip_size(&self, mip_level: u32) -> UVec2 {
        let size = self.size();
        UVec2::new((size.x >> mip_level).max(1), (size.y >> mip_level).max(1))
    }

    /// Number of array layers (1 for non-array kinds, 6 for cubes)
    pub fn layer_count(&self) -> u32 {
        match &self.kind {
            TextureKind::Texture2DArray { layers } => *layers,
            TextureKind::TextureCube => 6,
            TextureKind::Texture3D { depth } => *depth,
            TextureKind::View { layer_count, .. } => *layer_count,
            TextureKind::Texture2D | TextureKind::RenderBuffer => 1,
        }
    }

    fn store_size(&self, size: UVec2) -> bool {
        let mut current = self.size.write().unwrap_or_else(PoisonError::into_inner);
        if *current == size {
            return false;
        }
        *current = size;
        true
    }
}

/// Outcome of `GenericRenderObject::resize_texture`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureResize {
    /// Storage reallocated, `Resized` delivered to observers
    Resized,
    /// Already at the requested size
    Unchanged,
    /// Texture is fixed-size; owner must destroy and recreate it
    NotResizable,
    /// Views follow their source texture
    DerivedView,
    /// Kind can't be resized in place (cube, 3D)
    Unsupported,
    /// Object isn't a texture
    NotATexture,
}

impl GenericRenderObject {
    /// Resize a texture in place
    ///
    /// Only resizable 2D textures, 2D arrays and render buffers change size.
    /// Zero extents are clamped to one pixel.
    pub fn resize_texture(&self, width: u32, height: u32) -> TextureResize {
        let Some(texture) = self.as_texture() else {
            return TextureResize::NotATexture;
        };

        match texture.kind() {
            TextureKind::View { .. } => TextureResize::DerivedView,
            TextureKind::TextureCube | TextureKind::Texture3D { .. } => TextureResize::Unsupported,
            TextureKind::Texture2D | TextureKind::Texture2DArray { .. } | TextureKind::RenderBuffer => {
                if !texture.is_resizable() {
                    return TextureResize::NotResizable;
                }
                let size = UVec2::new(width.max(1), height.max(1));
                if !texture.store_size(size) {
                    return TextureResize::Unchanged;
                }
                self.notify(GenericEvent::Resized { width: size.x, height: size.y });
                TextureResize::Resized
            }
        }
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
