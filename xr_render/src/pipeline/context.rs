/// Explicit per-frame pipeline context
///
/// Replaces any process-wide "current pipeline" pointer: everything a
/// stage command touches is reached through this value. The context also
/// tracks the render areas and framebuffer binds opened by stages so the
/// chain can release whatever is left open.

use std::sync::Arc;
use glam::UVec2;
use crate::engine_warn;
use crate::commands::RenderCommandCollection;
use crate::render_object::{GenericRenderObject, RenderObjectRegistry};
use crate::renderer::{AbstractRenderer, BindRole, RenderArea};
use super::resources::{PipelineResources, RenderSizes};

pub struct PipelineContext<'a> {
    pub renderer: &'a mut AbstractRenderer,
    pub commands: &'a RenderCommandCollection,
    pub resources: &'a PipelineResources,
    pub sizes: RenderSizes,
    open_areas: usize,
    open_binds: Vec<(Arc<GenericRenderObject>, BindRole)>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        renderer: &'a mut AbstractRenderer,
        commands: &'a RenderCommandCollection,
        resources: &'a PipelineResources,
        sizes: RenderSizes,
    ) -> Self {
        Self {
            renderer,
            commands,
            resources,
            sizes,
            open_areas: 0,
            open_binds: Vec::new(),
        }
    }

    pub fn internal_size(&self) -> UVec2 {
        self.sizes.internal
    }

    pub fn full_size(&self) -> UVec2 {
        self.sizes.full
    }

    pub fn registry(&self) -> &Arc<RenderObjectRegistry> {
        self.renderer.registry()
    }

    pub fn push_render_area(&mut self, area: RenderArea) {
        self.renderer.push_render_area(area);
        self.open_areas += 1;
    }

    /// Pop an area pushed through this context; false if none is open
    pub fn pop_render_area(&mut self) -> bool {
        if self.open_areas == 0 {
            engine_warn!("xr::PipelineContext", "PopRenderArea without a matching push");
            return false;
        }
        self.open_areas -= 1;
        self.renderer.pop_render_area();
        true
    }

    pub fn bind_frame_buffer(&mut self, frame_buffer: &Arc<GenericRenderObject>, role: BindRole) -> bool {
        if !self.renderer.bind_frame_buffer(frame_buffer, role) {
            return false;
        }
        self.open_binds.push((frame_buffer.clone(), role));
        true
    }

    pub fn unbind_frame_buffer(&mut self, frame_buffer: &Arc<GenericRenderObject>, role: BindRole) -> bool {
        let position = self
            .open_binds
            .iter()
            .rposition(|(open, open_role)| open.id() == frame_buffer.id() && *open_role == role);
        let Some(position) = position else {
            engine_warn!("xr::PipelineContext", "Unbind of '{}' that this chain didn't bind", frame_buffer.name());
            return false;
        };
        self.open_binds.remove(position);
        self.renderer.unbind_frame_buffer(frame_buffer, role);
        true
    }

    pub fn open_area_count(&self) -> usize {
        self.open_areas
    }

    pub fn open_bind_count(&self) -> usize {
        self.open_binds.len()
    }

    /// Release every area and bind still open (innermost first)
    ///
    /// Returns (areas, binds) released.
    pub(crate) fn release_open(&mut self) -> (usize, usize) {
        let areas = self.open_areas;
        while self.open_areas > 0 {
            self.pop_render_area();
        }
        let binds = self.open_binds.len();
        while let Some((frame_buffer, role)) = self.open_binds.pop() {
            self.renderer.unbind_frame_buffer(&frame_buffer, role);
        }
        (areas, binds)
    }
}
