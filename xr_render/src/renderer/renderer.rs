/// AbstractRenderer - per-window rendering facade
///
/// Owns the backend, the API object cache, the render-area and crop-area
/// stacks and the framebuffer bind stacks. Everything except the cache is
/// render-thread state and takes no locks; the cache is shared with the
/// threads that resolve API objects while enqueueing draw work.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use glam::{Mat4, UVec2, Vec4};
use winit::dpi::PhysicalSize;
use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_error, engine_info, engine_warn};
use crate::render_api::{
    ApiObjectCache, ApiObjectRef, ApiRenderObject, BackendCapabilities, BlitMask, BlitRequest,
    GpuVendor, MemoryBarrierMask, PixelData, ReadBufferMode, RenderBackend,
};
use crate::render_object::{
    AttachmentKind, FrameBufferAttachment, FrameBufferTarget, GenericRenderObject, ObjectId,
    RenderObjectRegistry,
};
use super::frame_buffer_binding::{BindRole, BindTransition, FrameBufferBindStacks};
use super::render_area::{RenderArea, RenderAreaStack};

// ===== STATS =====

/// Per-frame counters, reset by the pipeline at frame start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub draw_calls: u32,
    pub frame_buffer_binds: u32,
    pub blits: u32,
    pub compute_dispatches: u32,
}

// ===== RENDERER =====

pub struct AbstractRenderer {
    config: RendererConfig,
    backend: Box<dyn RenderBackend>,
    capabilities: BackendCapabilities,
    registry: Arc<RenderObjectRegistry>,
    cache: Arc<ApiObjectCache>,
    window_size: UVec2,
    render_areas: RenderAreaStack,
    crop_areas: RenderAreaStack,
    bind_stacks: FrameBufferBindStacks,
    stats: RendererStats,
    cleaned_up: bool,
}

impl AbstractRenderer {
    /// Initialize the backend and realize every live generic object
    ///
    /// Wrappers are created for objects that existed before this renderer
    /// (no generation; resources are generated on first use).
    pub fn new(
        mut backend: Box<dyn RenderBackend>,
        registry: Arc<RenderObjectRegistry>,
        config: RendererConfig,
    ) -> Result<Self> {
        if let Err(e) = backend.initialize(&config) {
            engine_error!("xr::AbstractRenderer", "{} backend failed to initialize: {}", backend.name(), e);
            return Err(Error::InitializationFailed(e.to_string()));
        }

        let capabilities = backend.capabilities();
        let cache = ApiObjectCache::new(backend.object_factory());
        let materialized = cache.materialize(&registry.live_objects());

        engine_info!("xr::AbstractRenderer",
            "'{}' initialized on {} backend ({:?}), {} existing objects materialized",
            config.app_name, backend.name(), capabilities.vendor, materialized);

        Ok(Self {
            window_size: config.window_size.max(UVec2::ONE),
            config,
            backend,
            capabilities,
            registry,
            cache,
            render_areas: RenderAreaStack::new(),
            crop_areas: RenderAreaStack::new(),
            bind_stacks: FrameBufferBindStacks::new(),
            stats: RendererStats::default(),
            cleaned_up: false,
        })
    }

    /// Release every API object and shut the backend down (idempotent)
    pub fn clean_up(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        let released = self.cache.clear();
        self.bind_stacks.clear();
        self.render_areas.clear();
        self.crop_areas.clear();
        self.backend.clean_up();

        engine_info!("xr::AbstractRenderer", "'{}' cleaned up ({} API objects released)",
            self.config.app_name, released);
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    pub fn registry(&self) -> &Arc<RenderObjectRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ApiObjectCache> {
        &self.cache
    }

    pub fn stats(&self) -> RendererStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = RendererStats::default();
    }

    // ===== API OBJECTS =====

    pub fn get_or_create_api_object(
        &self,
        generic: &Arc<GenericRenderObject>,
        generate_now: bool,
    ) -> Option<ApiObjectRef> {
        self.cache.get_or_create(generic, generate_now)
    }

    pub fn try_get_api_object(&self, id: ObjectId) -> Option<ApiObjectRef> {
        self.cache.try_get(id)
    }

    pub fn generic_to_api<T: ApiRenderObject>(
        &self,
        generic: &Arc<GenericRenderObject>,
        generate_now: bool,
    ) -> Option<Arc<T>> {
        self.cache.generic_to_api(generic, generate_now)
    }

    // ===== WINDOW =====

    pub fn window_size(&self) -> UVec2 {
        self.window_size
    }

    /// Window resized; reissues the viewport if no render area is pushed
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.window_size = UVec2::new(size.width.max(1), size.height.max(1));
        if self.render_areas.is_empty() {
            self.backend.set_viewport(RenderArea::from_size(self.window_size));
        }
    }

    // ===== RENDER AREAS =====

    /// Top of the render-area stack, or the full window
    pub fn current_render_area(&self) -> RenderArea {
        self.render_areas.current(self.window_size)
    }

    pub fn render_area_depth(&self) -> usize {
        self.render_areas.depth()
    }

    pub fn push_render_area(&mut self, area: RenderArea) {
        self.render_areas.push(area);
        self.backend.set_viewport(area);
    }

    /// Pop the current area and restore the previous viewport
    pub fn pop_render_area(&mut self) -> Option<RenderArea> {
        let Some(popped) = self.render_areas.pop() else {
            engine_debug!("xr::AbstractRenderer", "pop_render_area on empty stack");
            return None;
        };
        let current = self.current_render_area();
        self.backend.set_viewport(current);
        Some(popped)
    }

    /// Push an area for the lifetime of the returned scope
    pub fn render_area_scope(&mut self, area: RenderArea) -> RenderAreaScope<'_> {
        self.push_render_area(area);
        RenderAreaScope { renderer: self }
    }

    /// Current scissor rectangle (None = scissor disabled)
    pub fn current_crop_area(&self) -> Option<RenderArea> {
        self.crop_areas.top()
    }

    pub fn push_crop_area(&mut self, area: RenderArea) {
        self.crop_areas.push(area);
        self.backend.set_scissor(Some(area));
    }

    pub fn pop_crop_area(&mut self) -> Option<RenderArea> {
        let popped = self.crop_areas.pop()?;
        let current = self.crop_areas.top();
        self.backend.set_scissor(current);
        Some(popped)
    }

    // ===== FRAMEBUFFER BINDING =====

    /// Push `frame_buffer` on the role's bind stack and bind it
    ///
    /// Pending target changes are re-attached on bind. Returns false for
    /// destroyed objects and non-framebuffers.
    pub fn bind_frame_buffer(&mut self, frame_buffer: &Arc<GenericRenderObject>, role: BindRole) -> bool {
        if frame_buffer.as_frame_buffer().is_none() {
            engine_warn!("xr::AbstractRenderer", "Cannot bind '{}': not a framebuffer", frame_buffer.name());
            return false;
        }
        if frame_buffer.is_destroyed() {
            engine_debug!("xr::AbstractRenderer", "Ignoring bind of destroyed framebuffer '{}'", frame_buffer.name());
            return false;
        }

        let transition = self.bind_stacks.push(role, frame_buffer.clone());
        self.apply_transition(role, transition);
        true
    }

    /// Pop `frame_buffer` from the role's stack; no-op unless it is on top
    pub fn unbind_frame_buffer(&mut self, frame_buffer: &GenericRenderObject, role: BindRole) {
        let transition = self.bind_stacks.pop(role, frame_buffer);
        self.apply_transition(role, transition);
    }

    /// Bind for the lifetime of the returned scope
    pub fn frame_buffer_scope(
        &mut self,
        frame_buffer: &Arc<GenericRenderObject>,
        role: BindRole,
    ) -> FrameBufferScope<'_> {
        let bound = self.bind_frame_buffer(frame_buffer, role);
        FrameBufferScope {
            renderer: self,
            frame_buffer: frame_buffer.clone(),
            role,
            bound,
        }
    }

    pub fn bound_frame_buffer(&self, role: BindRole) -> Option<&Arc<GenericRenderObject>> {
        self.bind_stacks.current(role)
    }

    pub fn bind_depth(&self, role: BindRole) -> usize {
        self.bind_stacks.depth(role)
    }

    fn apply_transition(&mut self, role: BindRole, transition: BindTransition) {
        match transition {
            BindTransition::Bind(frame_buffer) => {
                let Some(api) = self.cache.get_or_create(&frame_buffer, true) else {
                    engine_warn!("xr::AbstractRenderer",
                        "No API object for '{}', binding the default framebuffer", frame_buffer.name());
                    self.backend.bind_frame_buffer(role.bind_target(), None);
                    return;
                };
                self.backend.bind_frame_buffer(role.bind_target(), Some(&api));
                self.stats.frame_buffer_binds += 1;
                if let Some(previous) = self.cache.take_target_refresh(frame_buffer.id()) {
                    self.detach_replaced(&frame_buffer, &api, &previous);
                    self.attach_targets(&frame_buffer, &api);
                }
            }
            BindTransition::Unbind => self.backend.bind_frame_buffer(role.bind_target(), None),
            BindTransition::None => {}
        }
    }

    // ===== ATTACHMENTS =====

    /// Layered attachment is issued only where the driver lacks native multiview
    pub fn supports_multiview_attach(&self) -> bool {
        !self.capabilities.native_multiview && self.capabilities.vendor != GpuVendor::Nvidia
    }

    /// Attach target `index` of a (bound) framebuffer
    pub fn attach(&mut self, frame_buffer: &Arc<GenericRenderObject>, index: usize) -> bool {
        let Some((api, target)) = self.resolve_target(frame_buffer, index) else {
            return false;
        };
        self.attach_target(&api, &target)
    }

    /// Detach target `index` of a (bound) framebuffer
    pub fn detach(&mut self, frame_buffer: &Arc<GenericRenderObject>, index: usize) -> bool {
        let Some((api, target)) = self.resolve_target(frame_buffer, index) else {
            return false;
        };
        self.detach_target(&api, &target)
    }

    /// Bind (general), attach every target in order, refresh draw buffers
    pub fn attach_all(&mut self, frame_buffer: &Arc<GenericRenderObject>) -> bool {
        let Some(api) = self.frame_buffer_api(frame_buffer) else {
            return false;
        };
        // attached below; skip the refresh on bind
        let previous = self.cache.take_target_refresh(frame_buffer.id()).unwrap_or_default();

        let mut scope = self.frame_buffer_scope(frame_buffer, BindRole::General);
        scope.detach_replaced(frame_buffer, &api, &previous);
        scope.attach_targets(frame_buffer, &api);
        true
    }

    /// Bind (general), detach every target in order, refresh draw buffers
    pub fn detach_all(&mut self, frame_buffer: &Arc<GenericRenderObject>) -> bool {
        let Some(api) = self.frame_buffer_api(frame_buffer) else {
            return false;
        };
        let previous = self.cache.take_target_refresh(frame_buffer.id()).unwrap_or_default();

        let mut scope = self.frame_buffer_scope(frame_buffer, BindRole::General);
        scope.detach_replaced(frame_buffer, &api, &previous);
        if let Some(targets) = frame_buffer.as_frame_buffer().map(|fb| fb.targets()) {
            for target in &targets {
                scope.detach_target(&api, target);
            }
        }
        scope.refresh_draw_buffers(frame_buffer);
        true
    }

    /// Re-issue the framebuffer's draw buffer list
    pub fn refresh_draw_buffers(&mut self, frame_buffer: &Arc<GenericRenderObject>) {
        let Some(draw_buffers) = frame_buffer.as_frame_buffer().map(|fb| fb.draw_buffers()) else {
            return;
        };
        if let Some(api) = self.cache.get_or_create(frame_buffer, true) {
            self.backend.set_draw_buffers(&api, &draw_buffers);
        }
    }

    fn frame_buffer_api(&self, frame_buffer: &Arc<GenericRenderObject>) -> Option<ApiObjectRef> {
        if frame_buffer.as_frame_buffer().is_none() {
            engine_warn!("xr::AbstractRenderer", "'{}' is not a framebuffer", frame_buffer.name());
            return None;
        }
        if frame_buffer.is_destroyed() {
            engine_debug!("xr::AbstractRenderer", "Ignoring destroyed framebuffer '{}'", frame_buffer.name());
            return None;
        }
        self.cache.get_or_create(frame_buffer, true)
    }

    fn resolve_target(
        &self,
        frame_buffer: &Arc<GenericRenderObject>,
        index: usize,
    ) -> Option<(ApiObjectRef, FrameBufferTarget)> {
        let api = self.frame_buffer_api(frame_buffer)?;
        let target = frame_buffer.as_frame_buffer().and_then(|fb| fb.target(index));
        let Some(target) = target else {
            engine_warn!("xr::AbstractRenderer",
                "Render target index {} out of range for '{}'", index, frame_buffer.name());
            return None;
        };
        Some((api, target))
    }

    fn attach_targets(&mut self, frame_buffer: &GenericRenderObject, api: &ApiObjectRef) {
        let Some(fb) = frame_buffer.as_frame_buffer() else {
            return;
        };
        for target in fb.targets() {
            self.attach_target(api, &target);
        }
        self.backend.set_draw_buffers(api, &fb.draw_buffers());
    }

    /// Detach previously attached targets whose slot the current list no longer uses
    fn detach_replaced(&mut self, frame_buffer: &GenericRenderObject, api: &ApiObjectRef, previous: &[FrameBufferTarget]) {
        let current = frame_buffer.as_frame_buffer().map(|fb| fb.targets()).unwrap_or_default();
        for target in previous {
            if !current.iter().any(|t| t.attachment == target.attachment) {
                self.detach_target(api, target);
            }
        }
    }

    fn attachment_kind(&self, target: &FrameBufferTarget) -> Option<AttachmentKind> {
        if let FrameBufferAttachment::Color(index) = target.attachment {
            if index >= self.capabilities.max_color_attachments {
                engine_warn!("xr::AbstractRenderer",
                    "Color attachment {} of '{}' exceeds the backend limit of {}",
                    index, target.target.name(), self.capabilities.max_color_attachments);
                return None;
            }
        }
        let Some(kind) = target.attachment_kind() else {
            engine_warn!("xr::AbstractRenderer",
                "'{}' can't be attached as {:?} (layer {})", target.target.name(), target.attachment, target.layer_index);
            return None;
        };
        if matches!(kind, AttachmentKind::Multiview { .. }) && !self.supports_multiview_attach() {
            engine_debug!("xr::AbstractRenderer",
                "Skipping multiview attachment of '{}' (native multiview)", target.target.name());
            return None;
        }
        Some(kind)
    }

    fn attach_target(&mut self, api: &ApiObjectRef, target: &FrameBufferTarget) -> bool {
        let Some(kind) = self.attachment_kind(target) else {
            return false;
        };
        let Some(target_api) = self.cache.get_or_create(&target.target, true) else {
            return false;
        };
        self.backend.attach(api, target.attachment, &target_api, kind);
        true
    }

    fn detach_target(&mut self, api: &ApiObjectRef, target: &FrameBufferTarget) -> bool {
        let Some(kind) = self.attachment_kind(target) else {
            return false;
        };
        self.backend.detach(api, target.attachment, kind);
        true
    }

    // ===== ABSTRACT OPERATIONS =====

    pub fn set_clear_color(&mut self, color: Vec4) {
        self.backend.set_clear_color(color);
    }

    pub fn clear(&mut self, color: bool, depth: bool, stencil: bool) {
        self.backend.clear(color, depth, stencil);
    }

    /// Copy between framebuffers (None = default framebuffer)
    #[allow(clippy::too_many_arguments)]
    pub fn blit(
        &mut self,
        source: Option<&Arc<GenericRenderObject>>,
        destination: Option<&Arc<GenericRenderObject>>,
        source_area: RenderArea,
        destination_area: RenderArea,
        read_buffer: ReadBufferMode,
        color: bool,
        depth: bool,
        stencil: bool,
        linear_filter: bool,
    ) -> bool {
        let resolve = |object: Option<&Arc<GenericRenderObject>>| -> std::result::Result<Option<ApiObjectRef>, ()> {
            match object {
                Some(object) => self.cache.get_or_create(object, true).map(Some).ok_or(()),
                None => Ok(None),
            }
        };
        let (Ok(source), Ok(destination)) = (resolve(source), resolve(destination)) else {
            engine_warn!("xr::AbstractRenderer", "Blit skipped: framebuffer unavailable");
            return false;
        };

        let mut mask = BlitMask::empty();
        mask.set(BlitMask::COLOR, color);
        mask.set(BlitMask::DEPTH, depth);
        mask.set(BlitMask::STENCIL, stencil);

        self.backend.blit(&BlitRequest {
            source,
            destination,
            source_area,
            destination_area,
            read_buffer,
            mask,
            linear_filter,
        });
        self.stats.blits += 1;
        true
    }

    pub fn dispatch_compute(
        &mut self,
        program: &Arc<GenericRenderObject>,
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    ) -> bool {
        let Some(api) = self.ready_api(program) else {
            return false;
        };
        self.backend.dispatch_compute(&api, groups_x, groups_y, groups_z);
        self.stats.compute_dispatches += 1;
        true
    }

    pub fn memory_barrier(&mut self, mask: MemoryBarrierMask) {
        self.backend.memory_barrier(mask);
    }

    /// Draw a mesh; skipped while either resource is not resident
    pub fn draw_mesh(
        &mut self,
        mesh: &Arc<GenericRenderObject>,
        material: &Arc<GenericRenderObject>,
        world: &Mat4,
        instances: u32,
    ) -> bool {
        let (Some(mesh_api), Some(material_api)) = (self.ready_api(mesh), self.ready_api(material)) else {
            return false;
        };
        self.backend.draw_mesh(&mesh_api, &material_api, world, instances.max(1));
        self.stats.draw_calls += 1;
        true
    }

    pub fn draw_full_screen_quad(&mut self, material: &Arc<GenericRenderObject>) -> bool {
        let Some(api) = self.ready_api(material) else {
            return false;
        };
        self.backend.draw_full_screen_quad(&api);
        self.stats.draw_calls += 1;
        true
    }

    /// Read one RGBA8 pixel of the bound read framebuffer
    pub fn get_pixel_async<F>(&mut self, x: i32, y: i32, callback: F)
    where
        F: FnOnce(Result<[u8; 4]>) + Send + 'static,
    {
        self.backend.read_pixels(
            RenderArea::new(x, y, 1, 1),
            Box::new(move |result| {
                callback(result.and_then(|pixels| {
                    pixels
                        .pixel(0, 0)
                        .ok_or_else(|| Error::InvalidResource("empty pixel readback".to_string()))
                }))
            }),
        );
    }

    /// Read the depth value at a pixel
    pub fn get_depth_async<F>(&mut self, x: u32, y: u32, callback: F)
    where
        F: FnOnce(Result<f32>) + Send + 'static,
    {
        self.backend.read_depth(x, y, Box::new(callback));
    }

    /// Read the whole window
    pub fn get_screenshot_async<F>(&mut self, callback: F)
    where
        F: FnOnce(Result<PixelData>) + Send + 'static,
    {
        let area = RenderArea::from_size(self.window_size);
        self.backend.read_pixels(area, Box::new(callback));
    }

    fn ready_api(&self, generic: &Arc<GenericRenderObject>) -> Option<ApiObjectRef> {
        let api = self.cache.get_or_create(generic, true)?;
        if !api.is_generated() {
            engine_debug!("xr::AbstractRenderer", "'{}' not resident, skipping", generic.name());
            return None;
        }
        Some(api)
    }
}

impl Drop for AbstractRenderer {
    fn drop(&mut self) {
        self.clean_up();
    }
}

// ===== SCOPES =====

/// Pops its render area when dropped
pub struct RenderAreaScope<'a> {
    renderer: &'a mut AbstractRenderer,
}

impl Deref for RenderAreaScope<'_> {
    type Target = AbstractRenderer;

    fn deref(&self) -> &AbstractRenderer {
        self.renderer
    }
}

impl DerefMut for RenderAreaScope<'_> {
    fn deref_mut(&mut self) -> &mut AbstractRenderer {
        self.renderer
    }
}

impl Drop for RenderAreaScope<'_> {
    fn drop(&mut self) {
        self.renderer.pop_render_area();
    }
}

/// Unbinds its framebuffer when dropped
pub struct FrameBufferScope<'a> {
    renderer: &'a mut AbstractRenderer,
    frame_buffer: Arc<GenericRenderObject>,
    role: BindRole,
    bound: bool,
}

impl FrameBufferScope<'_> {
    /// False if the bind was refused (scope release is then a no-op)
    pub fn is_bound(&self) -> bool {
        self.bound
    }
}

impl Deref for FrameBufferScope<'_> {
    type Target = AbstractRenderer;

    fn deref(&self) -> &AbstractRenderer {
        self.renderer
    }
}

impl DerefMut for FrameBufferScope<'_> {
    fn deref_mut(&mut self) -> &mut AbstractRenderer {
        self.renderer
    }
}

impl Drop for FrameBufferScope<'_> {
    fn drop(&mut self) {
        if self.bound {
            self.renderer.unbind_frame_buffer(&self.frame_buffer, self.role);
        }
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
