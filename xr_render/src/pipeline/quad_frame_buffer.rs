/// Framebuffer filled by one full-screen quad draw
///
/// Used for single-draw precomputations such as the split-sum BRDF
/// lookup table.

use std::sync::Arc;
use crate::engine_warn;
use crate::error::Result;
use crate::render_object::{
    FrameBufferTarget, GenericRenderObject, RenderObjectRegistry, ShaderStage, TextureDesc, TextureFormat,
};
use crate::renderer::{AbstractRenderer, BindRole, RenderArea};

pub const BRDF_VERTEX_SHADER: &str = "fullscreen_quad.vert";
pub const BRDF_FRAGMENT_SHADER: &str = "brdf_lut.frag";

pub struct QuadFrameBuffer {
    frame_buffer: Arc<GenericRenderObject>,
    material: Arc<GenericRenderObject>,
}

impl QuadFrameBuffer {
    pub fn new(
        registry: &RenderObjectRegistry,
        name: &str,
        targets: Vec<FrameBufferTarget>,
        material: Arc<GenericRenderObject>,
    ) -> Result<Self> {
        let frame_buffer = registry.create_frame_buffer(name, targets)?;
        Ok(Self { frame_buffer, material })
    }

    pub fn frame_buffer(&self) -> &Arc<GenericRenderObject> {
        &self.frame_buffer
    }

    pub fn material(&self) -> &Arc<GenericRenderObject> {
        &self.material
    }

    /// Bind for writing, cover the whole framebuffer and draw the quad
    pub fn render(&self, renderer: &mut AbstractRenderer) -> bool {
        let Some(size) = self.frame_buffer.as_frame_buffer().and_then(|fb| fb.size()) else {
            engine_warn!("xr::QuadFrameBuffer", "'{}' has no sized target", self.frame_buffer.name());
            return false;
        };

        let mut bound = renderer.frame_buffer_scope(&self.frame_buffer, BindRole::Write);
        if !bound.is_bound() {
            return false;
        }
        let mut area = bound.render_area_scope(RenderArea::from_size(size));
        let drawn = area.draw_full_screen_quad(&self.material);
        drawn
    }

    /// Destroy the framebuffer and the material
    pub fn destroy(&self) {
        self.frame_buffer.destroy();
        self.material.destroy();
    }
}

/// Render the BRDF integration table into a new `size`x`size` RG16F texture
///
/// The framebuffer, material and shaders used for the draw are destroyed
/// afterwards; only the texture survives.
pub fn precompute_brdf(renderer: &mut AbstractRenderer, size: u32) -> Result<Arc<GenericRenderObject>> {
    let registry = renderer.registry().clone();
    let size = size.max(1);

    let texture = registry.create_texture(
        "BRDF LUT",
        TextureDesc::texture_2d(size, size, TextureFormat::R16G16_SFLOAT).with_resizable(false),
    )?;
    let vertex = registry.create_shader("BRDF vertex", ShaderStage::Vertex, BRDF_VERTEX_SHADER)?;
    let fragment = registry.create_shader("BRDF fragment", ShaderStage::Fragment, BRDF_FRAGMENT_SHADER)?;
    let material = registry.create_material("BRDF", vec![vertex.clone(), fragment.clone()], Vec::new())?;
    let quad = QuadFrameBuffer::new(&registry, "BRDF", vec![FrameBufferTarget::color(texture.clone(), 0)], material)?;

    if !quad.render(renderer) {
        engine_warn!("xr::precompute_brdf", "BRDF table {}x{} was not drawn", size, size);
    }

    quad.destroy();
    vertex.destroy();
    fragment.destroy();
    Ok(texture)
}

