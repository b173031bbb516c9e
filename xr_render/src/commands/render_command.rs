/// Render commands and pass sorters

use std::cmp::Ordering;
use crate::error::Result;
use crate::renderer::AbstractRenderer;

/// Render pass identifier (opaque, transparent, on-top...)
pub type RenderPass = i32;

/// Ordering key of a command: distance first, then a stable secondary key
/// (material or shader id) so equal distances don't flicker
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SortKey {
    pub distance: f32,
    pub secondary: u64,
}

impl SortKey {
    pub fn new(distance: f32, secondary: u64) -> Self {
        Self { distance, secondary }
    }

    /// Total order (NaN distances sort after every finite distance)
    pub fn compare(&self, other: &SortKey) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.secondary.cmp(&other.secondary))
    }
}

/// One unit of draw work
///
/// Commands are shared (`Arc`) between the collection and their owner, so
/// every hook takes `&self`; per-frame state uses interior mutability.
pub trait RenderCommand: Send + Sync {
    fn render_pass(&self) -> RenderPass;

    /// Disabled commands stay queued but are not rendered
    fn is_enabled(&self) -> bool {
        true
    }

    fn sort_key(&self) -> SortKey {
        SortKey::default()
    }

    /// Order relative to another command of the same pass
    fn compare_to(&self, other: &dyn RenderCommand) -> Ordering {
        self.sort_key().compare(&other.sort_key())
    }

    /// Called once per frame before any pass renders
    fn pre_render(&self) {}

    /// Called once per frame when this command becomes the rendering side
    fn swap_buffers(&self) {}

    fn render(&self, renderer: &mut AbstractRenderer) -> Result<()>;
}

/// Ordering policy of a render pass bucket
pub trait RenderCommandSorter: Send + Sync {
    fn compare(&self, a: &dyn RenderCommand, b: &dyn RenderCommand) -> Ordering;
}

/// Ascending `compare_to` (opaque geometry, front to back)
#[derive(Debug, Clone, Copy, Default)]
pub struct NearToFarRenderCommandSorter;

impl RenderCommandSorter for NearToFarRenderCommandSorter {
    fn compare(&self, a: &dyn RenderCommand, b: &dyn RenderCommand) -> Ordering {
        a.compare_to(b)
    }
}

/// Descending `compare_to` (transparent geometry, back to front)
#[derive(Debug, Clone, Copy, Default)]
pub struct FarToNearRenderCommandSorter;

impl RenderCommandSorter for FarToNearRenderCommandSorter {
    fn compare(&self, a: &dyn RenderCommand, b: &dyn RenderCommand) -> Ordering {
        a.compare_to(b).reverse()
    }
}
