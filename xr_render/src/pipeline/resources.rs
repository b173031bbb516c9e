/// Pipeline-owned intermediate textures and framebuffers
///
/// Textures are sized to the internal (render) or full (display)
/// resolution. On resize:
/// - resizable textures are resized in place
/// - fixed-size textures are destroyed and recreated by their factory
/// - views follow their source and are left alone
/// - cube/3D textures can't follow the window; they are skipped with a warning
///
/// Framebuffers that referenced a recreated texture are rebuilt.

use std::sync::Arc;
use glam::UVec2;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::error::Result;
use crate::{engine_debug, engine_warn};
use crate::render_object::{GenericRenderObject, ObjectId, RenderObjectRegistry, TextureResize};

new_key_type! {
    /// Stable key of a pipeline texture
    pub struct PipelineTextureKey;
}

/// Resolution a pipeline texture follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureScale {
    /// Render resolution (window size times resolution scale)
    Internal,
    /// Display resolution
    Full,
}

/// Internal and full resolution of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSizes {
    pub internal: UVec2,
    pub full: UVec2,
}

impl RenderSizes {
    pub fn new(internal: UVec2, full: UVec2) -> Self {
        Self { internal, full }
    }

    pub fn for_scale(&self, scale: TextureScale) -> UVec2 {
        match scale {
            TextureScale::Internal => self.internal,
            TextureScale::Full => self.full,
        }
    }
}

/// Builds a pipeline texture at a given size
pub type TextureFactory =
    Box<dyn Fn(&RenderObjectRegistry, UVec2) -> Result<Arc<GenericRenderObject>> + Send + Sync>;

/// Builds a pipeline framebuffer from the current textures
pub type FrameBufferFactory =
    Box<dyn Fn(&RenderObjectRegistry, &PipelineResources) -> Result<Arc<GenericRenderObject>> + Send + Sync>;

struct PipelineTexture {
    name: String,
    texture: Arc<GenericRenderObject>,
    scale: TextureScale,
    factory: TextureFactory,
}

struct PipelineFrameBuffer {
    frame_buffer: Arc<GenericRenderObject>,
    factory: FrameBufferFactory,
}

/// Outcome of `PipelineResources::resize`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeReport {
    pub resized: usize,
    pub recreated: usize,
    pub rebuilt_frame_buffers: usize,
    pub skipped: usize,
}

#[derive(Default)]
pub struct PipelineResources {
    textures: SlotMap<PipelineTextureKey, PipelineTexture>,
    texture_names: FxHashMap<String, PipelineTextureKey>,
    frame_buffers: FxHashMap<String, PipelineFrameBuffer>,
}

impl PipelineResources {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== TEXTURES =====

    /// Create a named texture at the size matching `scale`
    ///
    /// An existing texture with the same name is destroyed and replaced.
    pub fn add_texture<F>(
        &mut self,
        registry: &RenderObjectRegistry,
        name: &str,
        scale: TextureScale,
        sizes: RenderSizes,
        factory: F,
    ) -> Result<PipelineTextureKey>
    where
        F: Fn(&RenderObjectRegistry, UVec2) -> Result<Arc<GenericRenderObject>> + Send + Sync + 'static,
    {
        let texture = factory(registry, sizes.for_scale(scale))?;
        if let Some(previous) = self.remove_texture(name) {
            previous.destroy();
        }

        let key = self.textures.insert(PipelineTexture {
            name: name.to_string(),
            texture,
            scale,
            factory: Box::new(factory),
        });
        self.texture_names.insert(name.to_string(), key);
        Ok(key)
    }

    pub fn texture(&self, name: &str) -> Option<&Arc<GenericRenderObject>> {
        let key = self.texture_names.get(name)?;
        self.texture_by_key(*key)
    }

    pub fn texture_by_key(&self, key: PipelineTextureKey) -> Option<&Arc<GenericRenderObject>> {
        self.textures.get(key).map(|entry| &entry.texture)
    }

    pub fn texture_key(&self, name: &str) -> Option<PipelineTextureKey> {
        self.texture_names.get(name).copied()
    }

    /// Remove without destroying; returns the texture
    pub fn remove_texture(&mut self, name: &str) -> Option<Arc<GenericRenderObject>> {
        let key = self.texture_names.remove(name)?;
        self.textures.remove(key).map(|entry| entry.texture)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // ===== FRAMEBUFFERS =====

    /// Create a named framebuffer through `factory`
    pub fn add_frame_buffer<F>(
        &mut self,
        registry: &RenderObjectRegistry,
        name: &str,
        factory: F,
    ) -> Result<Arc<GenericRenderObject>>
    where
        F: Fn(&RenderObjectRegistry, &PipelineResources) -> Result<Arc<GenericRenderObject>> + Send + Sync + 'static,
    {
        let frame_buffer = factory(registry, self)?;
        let previous = self.frame_buffers.insert(name.to_string(), PipelineFrameBuffer {
            frame_buffer: frame_buffer.clone(),
            factory: Box::new(factory),
        });
        if let Some(previous) = previous {
            previous.frame_buffer.destroy();
        }
        Ok(frame_buffer)
    }

    pub fn frame_buffer(&self, name: &str) -> Option<&Arc<GenericRenderObject>> {
        self.frame_buffers.get(name).map(|entry| &entry.frame_buffer)
    }

    pub fn frame_buffer_count(&self) -> usize {
        self.frame_buffers.len()
    }

    // ===== RESIZE =====

    /// Apply the resize policy to every texture
    pub fn resize(&mut self, registry: &RenderObjectRegistry, sizes: RenderSizes) -> ResizeReport {
        let mut report = ResizeReport::default();
        let mut recreated_ids: Vec<ObjectId> = Vec::new();

        for (_, entry) in self.textures.iter_mut() {
            let size = sizes.for_scale(entry.scale);
            match entry.texture.resize_texture(size.x, size.y) {
                TextureResize::Resized => report.resized += 1,
                TextureResize::Unchanged | TextureResize::DerivedView => {}
                TextureResize::NotResizable => match (entry.factory)(registry, size) {
                    Ok(texture) => {
                        let previous = std::mem::replace(&mut entry.texture, texture);
                        recreated_ids.push(previous.id());
                        previous.destroy();
                        report.recreated += 1;
                    }
                    Err(e) => {
                        engine_warn!("xr::PipelineResources", "Failed to recreate '{}': {}", entry.name, e);
                    }
                },
                TextureResize::Unsupported | TextureResize::NotATexture => {
                    engine_warn!("xr::PipelineResources",
                        "'{}' ({:?}) can't follow the window size, skipped", entry.name, entry.texture.kind());
                    report.skipped += 1;
                }
            }
        }

        if !recreated_ids.is_empty() {
            report.rebuilt_frame_buffers = self.rebuild_frame_buffers(registry, &recreated_ids);
        }

        engine_debug!("xr::PipelineResources",
            "Resized to {}x{} (internal {}x{}): {:?}",
            sizes.full.x, sizes.full.y, sizes.internal.x, sizes.internal.y, report);
        report
    }

    fn rebuild_frame_buffers(&mut self, registry: &RenderObjectRegistry, stale: &[ObjectId]) -> usize {
        let names: Vec<String> = self
            .frame_buffers
            .iter()
            .filter(|(_, entry)| {
                entry
                    .frame_buffer
                    .as_frame_buffer()
                    .map_or(false, |fb| stale.iter().any(|id| fb.references(*id)))
            })
            .map(|(name, _)| name.clone())
            .collect();

        let mut rebuilt = 0;
        for name in names {
            let Some(entry) = self.frame_buffers.remove(&name) else {
                continue;
            };
            match (entry.factory)(registry, self) {
                Ok(frame_buffer) => {
                    entry.frame_buffer.destroy();
                    self.frame_buffers.insert(name, PipelineFrameBuffer { frame_buffer, factory: entry.factory });
                    rebuilt += 1;
                }
                Err(e) => {
                    engine_warn!("xr::PipelineResources", "Failed to rebuild framebuffer '{}': {}", name, e);
                    self.frame_buffers.insert(name, entry);
                }
            }
        }
        rebuilt
    }

    /// Destroy every framebuffer and texture
    pub fn destroy_all(&mut self) {
        for (_, entry) in self.frame_buffers.drain() {
            entry.frame_buffer.destroy();
        }
        for (_, entry) in self.textures.drain() {
            entry.texture.destroy();
        }
        self.texture_names.clear();
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;
