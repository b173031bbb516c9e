/// Concrete render commands: mesh draws and closures

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use glam::{Mat4, Vec3};
use crate::error::{Error, Result};
use crate::renderer::AbstractRenderer;
use crate::render_object::GenericRenderObject;
use super::render_command::{RenderCommand, RenderPass, SortKey};

// ===== MESH =====

#[derive(Debug, Clone, Copy)]
struct MeshState {
    /// Written by the update thread
    pending_world: Mat4,
    /// Read by the render thread, refreshed on swap
    world: Mat4,
    camera_position: Vec3,
}

/// Draws a mesh with a material
///
/// The world matrix is double-buffered: `set_world_matrix` writes the
/// pending side, `swap_buffers` publishes it to the render side. Sorting
/// uses the distance from the camera to the pending translation, with the
/// material id as tiebreaker.
pub struct MeshRenderCommand {
    pass: RenderPass,
    mesh: Arc<GenericRenderObject>,
    material: Arc<GenericRenderObject>,
    instances: u32,
    enabled: AtomicBool,
    state: Mutex<MeshState>,
}

impl MeshRenderCommand {
    pub fn new(
        pass: RenderPass,
        mesh: Arc<GenericRenderObject>,
        material: Arc<GenericRenderObject>,
        world: Mat4,
    ) -> Self {
        Self {
            pass,
            mesh,
            material,
            instances: 1,
            enabled: AtomicBool::new(true),
            state: Mutex::new(MeshState {
                pending_world: world,
                world,
                camera_position: Vec3::ZERO,
            }),
        }
    }

    pub fn with_instances(mut self, instances: u32) -> Self {
        self.instances = instances.max(1);
        self
    }

    pub fn mesh(&self) -> &Arc<GenericRenderObject> {
        &self.mesh
    }

    pub fn material(&self) -> &Arc<GenericRenderObject> {
        &self.material
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Update-side world matrix (visible to render after the next swap)
    pub fn set_world_matrix(&self, world: Mat4) {
        self.lock_state().pending_world = world;
    }

    pub fn set_camera_position(&self, position: Vec3) {
        self.lock_state().camera_position = position;
    }

    /// Render-side world matrix
    pub fn world_matrix(&self) -> Mat4 {
        self.lock_state().world
    }

    pub fn distance_to_camera(&self) -> f32 {
        let state = self.lock_state();
        state.pending_world.w_axis.truncate().distance(state.camera_position)
    }

    fn lock_state(&self) -> MutexGuard<'_, MeshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderCommand for MeshRenderCommand {
    fn render_pass(&self) -> RenderPass {
        self.pass
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn sort_key(&self) -> SortKey {
        SortKey::new(self.distance_to_camera(), self.material.id().sort_bits())
    }

    fn swap_buffers(&self) {
        let mut state = self.lock_state();
        state.world = state.pending_world;
    }

    fn render(&self, renderer: &mut AbstractRenderer) -> Result<()> {
        let world = self.world_matrix();
        if !renderer.draw_mesh(&self.mesh, &self.material, &world, self.instances) {
            return Err(Error::InvalidResource(format!(
                "draw of '{}' with '{}' skipped, not resident", self.mesh.name(), self.material.name())));
        }
        Ok(())
    }
}

// ===== METHOD =====

pub type RenderMethod = Box<dyn Fn(&mut AbstractRenderer) -> Result<()> + Send + Sync>;

/// Runs a closure (debug draws, custom GPU work)
pub struct MethodRenderCommand {
    pass: RenderPass,
    key: SortKey,
    enabled: AtomicBool,
    method: RenderMethod,
}

impl MethodRenderCommand {
    pub fn new<F>(pass: RenderPass, method: F) -> Self
    where
        F: Fn(&mut AbstractRenderer) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            pass,
            key: SortKey::default(),
            enabled: AtomicBool::new(true),
            method: Box::new(method),
        }
    }

    pub fn with_sort_key(mut self, key: SortKey) -> Self {
        self.key = key;
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl RenderCommand for MethodRenderCommand {
    fn render_pass(&self) -> RenderPass {
        self.pass
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn sort_key(&self) -> SortKey {
        self.key
    }

    fn render(&self, renderer: &mut AbstractRenderer) -> Result<()> {
        (self.method)(renderer)
    }
}

#[cfg(test)]
#[path = "mesh_command_tests.rs"]
mod tests;
