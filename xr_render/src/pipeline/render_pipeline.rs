/// Render pipeline: a named command chain plus the resources it draws into
///
/// Owns the pass configuration handed to new command collections, the
/// pipeline textures/framebuffers and the internal/full resolution pair.

use std::sync::Arc;
use glam::UVec2;
use crate::engine_info;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::commands::{RenderCommandCollection, RenderPassSorters};
use crate::render_object::{GenericRenderObject, RenderObjectRegistry};
use crate::renderer::AbstractRenderer;
use super::command_chain::{ChainReport, CommandChain};
use super::context::PipelineContext;
use super::quad_frame_buffer::precompute_brdf;
use super::resources::{PipelineResources, RenderSizes, ResizeReport};

pub struct RenderPipeline {
    config: PipelineConfig,
    chain: CommandChain,
    render_passes: RenderPassSorters,
    resources: PipelineResources,
    full_size: UVec2,
}

impl RenderPipeline {
    pub fn new(config: PipelineConfig, full_size: UVec2) -> Self {
        engine_info!("xr::RenderPipeline", "Pipeline '{}' created ({}x{})", config.name, full_size.x, full_size.y);
        Self {
            config,
            chain: CommandChain::new(),
            render_passes: Vec::new(),
            resources: PipelineResources::new(),
            full_size: full_size.max(UVec2::ONE),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ===== CONFIGURATION =====

    pub fn set_render_passes(&mut self, render_passes: RenderPassSorters) {
        self.render_passes = render_passes;
    }

    pub fn render_passes(&self) -> &RenderPassSorters {
        &self.render_passes
    }

    /// New collection configured with this pipeline's passes
    pub fn create_command_collection(&self) -> RenderCommandCollection {
        RenderCommandCollection::with_render_passes(self.render_passes.clone())
    }

    /// Apply this pipeline's passes to an existing collection
    ///
    /// Queued commands are dropped.
    pub fn configure_collection(&self, collection: &RenderCommandCollection) {
        collection.set_render_passes(self.render_passes.clone());
    }

    pub fn chain(&self) -> &CommandChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut CommandChain {
        &mut self.chain
    }

    pub fn set_chain(&mut self, chain: CommandChain) {
        self.chain = chain;
    }

    pub fn resources(&self) -> &PipelineResources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut PipelineResources {
        &mut self.resources
    }

    // ===== SIZES =====

    pub fn sizes(&self) -> RenderSizes {
        RenderSizes::new(self.config.internal_size(self.full_size), self.full_size)
    }

    pub fn full_size(&self) -> UVec2 {
        self.full_size
    }

    /// Follow a new display size; pipeline textures apply the resize policy
    pub fn resize(&mut self, registry: &RenderObjectRegistry, full_size: UVec2) -> ResizeReport {
        self.full_size = full_size.max(UVec2::ONE);
        let sizes = self.sizes();
        self.resources.resize(registry, sizes)
    }

    // ===== FRAME =====

    /// Render one frame
    ///
    /// Follows the renderer's window size, runs the pre-render hooks of the
    /// rendering side, then executes the chain.
    pub fn render(&mut self, renderer: &mut AbstractRenderer, commands: &RenderCommandCollection) -> ChainReport {
        let window = renderer.window_size();
        if window != self.full_size {
            let registry = renderer.registry().clone();
            self.resize(&registry, window);
        }

        renderer.reset_stats();
        commands.pre_render();

        let sizes = self.sizes();
        let mut ctx = PipelineContext::new(renderer, commands, &self.resources, sizes);
        self.chain.execute(&mut ctx)
    }

    /// BRDF lookup table at the configured size
    pub fn precompute_brdf(&self, renderer: &mut AbstractRenderer) -> Result<Arc<GenericRenderObject>> {
        precompute_brdf(renderer, self.config.brdf_size)
    }

    /// Destroy every pipeline resource
    pub fn release(&mut self) {
        self.resources.destroy_all();
    }
}

#[cfg(test)]
#[path = "render_pipeline_tests.rs"]
mod tests;
