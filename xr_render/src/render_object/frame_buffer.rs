/// Generic framebuffer: ordered attachment targets plus derived state
///
/// `TextureTypes` and `DrawBuffers` are recomputed each time the target
/// list is replaced, and always reflect the current targets:
/// - a depth/stencil attachment contributes DEPTH and STENCIL
/// - only color attachments appear in the draw buffer list

use std::sync::{Arc, PoisonError, RwLock};
use bitflags::bitflags;
use glam::UVec2;
use crate::engine_warn;
use super::generic_object::{GenericEvent, GenericRenderObject};
use super::object_id::ObjectId;
use super::texture::TextureKind;

bitflags! {
    /// Buffer kinds a framebuffer writes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureTypes: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Attachment point of a framebuffer target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameBufferAttachment {
    Color(u8),
    Depth,
    Stencil,
    DepthStencil,
}

impl FrameBufferAttachment {
    /// Buffer kinds written through this attachment point
    pub fn texture_types(&self) -> TextureTypes {
        match self {
            FrameBufferAttachment::Color(_) => TextureTypes::COLOR,
            FrameBufferAttachment::Depth => TextureTypes::DEPTH,
            FrameBufferAttachment::Stencil => TextureTypes::STENCIL,
            FrameBufferAttachment::DepthStencil => TextureTypes::DEPTH | TextureTypes::STENCIL,
        }
    }

    /// Draw buffer entry (color attachments only)
    pub fn draw_buffer(&self) -> Option<DrawBuffer> {
        match self {
            FrameBufferAttachment::Color(index) => Some(DrawBuffer::ColorAttachment(*index)),
            _ => None,
        }
    }
}

/// Color output selected for fragment writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawBuffer {
    ColorAttachment(u8),
}

/// Cube map face, in layer order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub fn from_layer(layer: i32) -> Option<Self> {
        match layer {
            0 => Some(CubeFace::PositiveX),
            1 => Some(CubeFace::NegativeX),
            2 => Some(CubeFace::PositiveY),
            3 => Some(CubeFace::NegativeY),
            4 => Some(CubeFace::PositiveZ),
            5 => Some(CubeFace::NegativeZ),
            _ => None,
        }
    }
}

/// How a target texture is bound to its attachment point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Whole 2D texture (or view) at a mip level
    Texture { mip_level: u32 },
    RenderBuffer,
    /// One layer of an array (or a 3D slice)
    ArrayLayer { layer: u32, mip_level: u32 },
    CubeFace { face: CubeFace, mip_level: u32 },
    /// Every layer of an array at once (layered/multiview rendering)
    Multiview { mip_level: u32, layer_count: u32 },
}

/// One attachment of a framebuffer
#[derive(Debug, Clone)]
pub struct FrameBufferTarget {
    pub target: Arc<GenericRenderObject>,
    pub attachment: FrameBufferAttachment,
    pub mip_level: i32,
    /// Negative on a 2D array selects all layers (multiview)
    pub layer_index: i32,
}

impl FrameBufferTarget {
    pub fn new(
        target: Arc<GenericRenderObject>,
        attachment: FrameBufferAttachment,
        mip_level: i32,
        layer_index: i32,
    ) -> Self {
        Self { target, attachment, mip_level, layer_index }
    }

    /// Color attachment at mip 0, no layer
    pub fn color(target: Arc<GenericRenderObject>, index: u8) -> Self {
        Self::new(target, FrameBufferAttachment::Color(index), 0, -1)
    }

    /// Attachment at mip 0, no layer
    pub fn with_attachment(target: Arc<GenericRenderObject>, attachment: FrameBufferAttachment) -> Self {
        Self::new(target, attachment, 0, -1)
    }

    /// Classify the attachment by target texture kind
    ///
    /// Returns None when the target can't be attached this way (not a
    /// texture, cube face out of range, array layer out of range).
    pub fn attachment_kind(&self) -> Option<AttachmentKind> {
        let texture = self.target.as_texture()?;
        let mip_level = self.mip_level.max(0) as u32;

        match texture.kind() {
            TextureKind::Texture2D | TextureKind::View { .. } => Some(AttachmentKind::Texture { mip_level }),
            TextureKind::RenderBuffer => Some(AttachmentKind::RenderBuffer),
            TextureKind::Texture2DArray { layers } => {
                if self.layer_index < 0 {
                    Some(AttachmentKind::Multiview { mip_level, layer_count: *layers })
                } else if (self.layer_index as u32) < *layers {
                    Some(AttachmentKind::ArrayLayer { layer: self.layer_index as u32, mip_level })
                } else {
                    None
                }
            }
            TextureKind::TextureCube => CubeFace::from_layer(self.layer_index)
                .map(|face| AttachmentKind::CubeFace { face, mip_level }),
            TextureKind::Texture3D { depth } => {
                if self.layer_index >= 0 && (self.layer_index as u32) < *depth {
                    Some(AttachmentKind::ArrayLayer { layer: self.layer_index as u32, mip_level })
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct FrameBufferState {
    targets: Vec<FrameBufferTarget>,
    texture_types: TextureTypes,
    draw_buffers: Vec<DrawBuffer>,
}

impl FrameBufferState {
    fn from_targets(targets: Vec<FrameBufferTarget>) -> Self {
        let texture_types = targets
            .iter()
            .fold(TextureTypes::empty(), |types, target| types | target.attachment.texture_types());
        let draw_buffers = targets
            .iter()
            .filter_map(|target| target.attachment.draw_buffer())
            .collect();
        Self { targets, texture_types, draw_buffers }
    }
}

/// Generic framebuffer
#[derive(Debug)]
pub struct FrameBuffer {
    state: RwLock<FrameBufferState>,
}

impl FrameBuffer {
    pub fn new(targets: Vec<FrameBufferTarget>) -> Self {
        Self { state: RwLock::new(FrameBufferState::from_targets(targets)) }
    }

    /// Snapshot of the ordered targets
    pub fn targets(&self) -> Vec<FrameBufferTarget> {
        self.read().targets.clone()
    }

    pub fn target(&self, index: usize) -> Option<FrameBufferTarget> {
        self.read().targets.get(index).cloned()
    }

    pub fn target_count(&self) -> usize {
        self.read().targets.len()
    }

    pub fn texture_types(&self) -> TextureTypes {
        self.read().texture_types
    }

    pub fn draw_buffers(&self) -> Vec<DrawBuffer> {
        self.read().draw_buffers.clone()
    }

    /// True if any target is the object with this id
    pub fn references(&self, id: ObjectId) -> bool {
        self.read().targets.iter().any(|target| target.target.id() == id)
    }

    /// Size of the first target at its mip level
    pub fn size(&self) -> Option<UVec2> {
        let state = self.read();
        let first = state.targets.first()?;
        let texture = first.target.as_texture()?;
        Some(texture.mip_size(first.mip_level.max(0) as u32))
    }

    fn replace_targets(&self, targets: Vec<FrameBufferTarget>) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = FrameBufferState::from_targets(targets);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, FrameBufferState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GenericRenderObject {
    /// Replace a framebuffer's targets
    ///
    /// Observers receive `TargetsChanging` before and `TargetsChanged` after
    /// the swap. Returns false if this object isn't a framebuffer.
    pub fn set_render_targets(&self, targets: Vec<FrameBufferTarget>) -> bool {
        let Some(frame_buffer) = self.as_frame_buffer() else {
            engine_warn!("xr::FrameBuffer", "set_render_targets on non-framebuffer '{}'", self.name());
            return false;
        };

        self.notify(GenericEvent::TargetsChanging);
        frame_buffer.replace_targets(targets);
        self.notify(GenericEvent::TargetsChanged);
        true
    }
}

#[cfg(test)]
#[path = "frame_buffer_tests.rs"]
mod tests;
