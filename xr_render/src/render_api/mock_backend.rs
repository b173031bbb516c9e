/// Mock backend for unit tests (no GPU required)
///
/// `MockBackend` records every call as a `MockCall` into a shared log that
/// tests keep a handle on after the backend moved into a renderer.
/// `MockObjectFactory` creates `MockApiObject`s which count generate and
/// destroy calls and record the generic events they receive.

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use glam::{Mat4, Vec4};
use crate::config::RendererConfig;
use crate::error::Result;
use crate::engine_bail;
use crate::render_object::{
    AttachmentKind, DrawBuffer, FrameBufferAttachment, GenericEvent, GenericRenderObject,
    ObjectId, RenderObjectKind,
};
use crate::renderer::RenderArea;
use super::api_object::{ApiRenderObject, NativeHandle, Residency};
use super::backend::{
    ApiObjectRef, BackendCapabilities, BlitMask, BlitRequest, DepthCallback, FrameBufferBindTarget,
    MemoryBarrierMask, PixelCallback, PixelData, ReadBufferMode, RenderBackend,
};
use super::object_cache::ApiObjectFactory;

// ============================================================================
// Mock API object
// ============================================================================

#[derive(Debug)]
pub struct MockApiObject {
    pub generic_id: ObjectId,
    pub kind: RenderObjectKind,
    pub native: NativeHandle,
    residency: Residency,
    pub generate_calls: AtomicUsize,
    pub destroy_calls: AtomicUsize,
    pub events: Mutex<Vec<GenericEvent>>,
    fail_generate: bool,
    generate_delay: Option<Duration>,
}

impl MockApiObject {
    pub fn new(generic_id: ObjectId, kind: RenderObjectKind, native: NativeHandle) -> Self {
        Self {
            generic_id,
            kind,
            native,
            residency: Residency::new(),
            generate_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
            fail_generate: false,
            generate_delay: None,
        }
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_count(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn received_events(&self) -> Vec<GenericEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ApiRenderObject for MockApiObject {
    fn generic_id(&self) -> ObjectId {
        self.generic_id
    }

    fn residency(&self) -> &Residency {
        &self.residency
    }

    fn handle(&self) -> Option<NativeHandle> {
        self.residency.is_resident().then_some(self.native)
    }

    fn generate_resource(&self) -> Result<()> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.generate_delay {
            std::thread::sleep(delay);
        }
        if self.fail_generate {
            engine_bail!("xr::MockApiObject", "Simulated allocation failure for {}", self.generic_id);
        }
        Ok(())
    }

    fn destroy_resource(&self) {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn on_generic_event(&self, _object: &GenericRenderObject, event: GenericEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// API object of another concrete type (typed-cast tests)
#[derive(Debug)]
pub struct OtherApiObject {
    pub generic_id: ObjectId,
    residency: Residency,
}

impl OtherApiObject {
    pub fn new(generic_id: ObjectId) -> Self {
        Self { generic_id, residency: Residency::new() }
    }
}

impl ApiRenderObject for OtherApiObject {
    fn generic_id(&self) -> ObjectId {
        self.generic_id
    }

    fn residency(&self) -> &Residency {
        &self.residency
    }

    fn handle(&self) -> Option<NativeHandle> {
        None
    }

    fn generate_resource(&self) -> Result<()> {
        Ok(())
    }

    fn destroy_resource(&self) {}

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// ============================================================================
// Mock object factory
// ============================================================================

#[derive(Debug, Default)]
pub struct MockObjectFactory {
    next_handle: AtomicU32,
    pub created: Mutex<Vec<Arc<MockApiObject>>>,
    pub fail_generate: AtomicBool,
    pub generate_delay: Mutex<Option<Duration>>,
    /// Meshes get an `OtherApiObject` instead of a `MockApiObject`
    pub meshes_as_other: AtomicBool,
    /// Kinds the factory refuses to wrap
    pub refused: Mutex<Vec<RenderObjectKind>>,
}

impl MockObjectFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    /// Mock wrapper created for a generic object, if any
    pub fn created_for(&self, id: ObjectId) -> Option<Arc<MockApiObject>> {
        self.created.lock().unwrap().iter().find(|api| api.generic_id == id).cloned()
    }
}

impl ApiObjectFactory for MockObjectFactory {
    fn create_api_object(&self, generic: &Arc<GenericRenderObject>) -> Option<Arc<dyn ApiRenderObject>> {
        if self.refused.lock().unwrap().contains(&generic.kind()) {
            return None;
        }
        if generic.kind() == RenderObjectKind::Mesh && self.meshes_as_other.load(Ordering::SeqCst) {
            return Some(Arc::new(OtherApiObject::new(generic.id())));
        }

        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        let mut api = MockApiObject::new(generic.id(), generic.kind(), handle);
        api.fail_generate = self.fail_generate.load(Ordering::SeqCst);
        api.generate_delay = *self.generate_delay.lock().unwrap();
        let api = Arc::new(api);
        self.created.lock().unwrap().push(api.clone());
        Some(api)
    }
}

// ============================================================================
// Mock backend
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Initialize,
    CleanUp,
    SetViewport(RenderArea),
    SetScissor(Option<RenderArea>),
    SetClearColor(Vec4),
    Clear { color: bool, depth: bool, stencil: bool },
    BindFrameBuffer { target: FrameBufferBindTarget, frame_buffer: Option<ObjectId> },
    SetDrawBuffers { frame_buffer: ObjectId, draw_buffers: Vec<DrawBuffer> },
    Attach { frame_buffer: ObjectId, attachment: FrameBufferAttachment, target: ObjectId, kind: AttachmentKind },
    Detach { frame_buffer: ObjectId, attachment: FrameBufferAttachment, kind: AttachmentKind },
    Blit {
        source: Option<ObjectId>,
        destination: Option<ObjectId>,
        source_area: RenderArea,
        destination_area: RenderArea,
        read_buffer: ReadBufferMode,
        mask: BlitMask,
        linear_filter: bool,
    },
    DispatchCompute { program: ObjectId, groups: (u32, u32, u32) },
    MemoryBarrier(MemoryBarrierMask),
    DrawMesh { mesh: ObjectId, material: ObjectId, instances: u32 },
    DrawFullScreenQuad { material: ObjectId },
    ReadPixels(RenderArea),
    ReadDepth { x: u32, y: u32 },
}

/// Backend recording calls without GPU
pub struct MockBackend {
    pub calls: Arc<Mutex<Vec<MockCall>>>,
    pub factory: Arc<MockObjectFactory>,
    pub capabilities: BackendCapabilities,
    pub fail_initialize: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_capabilities(BackendCapabilities::default())
    }

    pub fn with_capabilities(capabilities: BackendCapabilities) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            factory: MockObjectFactory::new(),
            capabilities,
            fail_initialize: false,
        }
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RenderBackend for MockBackend {
    fn name(&self) -> &str {
        "Mock"
    }

    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn initialize(&mut self, _config: &RendererConfig) -> Result<()> {
        if self.fail_initialize {
            engine_bail!("xr::MockBackend", "Simulated initialization failure");
        }
        self.record(MockCall::Initialize);
        Ok(())
    }

    fn clean_up(&mut self) {
        self.record(MockCall::CleanUp);
    }

    fn object_factory(&self) -> Arc<dyn ApiObjectFactory> {
        self.factory.clone()
    }

    fn set_viewport(&mut self, area: RenderArea) {
        self.record(MockCall::SetViewport(area));
    }

    fn set_scissor(&mut self, area: Option<RenderArea>) {
        self.record(MockCall::SetScissor(area));
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.record(MockCall::SetClearColor(color));
    }

    fn clear(&mut self, color: bool, depth: bool, stencil: bool) {
        self.record(MockCall::Clear { color, depth, stencil });
    }

    fn bind_frame_buffer(&mut self, target: FrameBufferBindTarget, frame_buffer: Option<&ApiObjectRef>) {
        self.record(MockCall::BindFrameBuffer {
            target,
            frame_buffer: frame_buffer.map(|fbo| fbo.generic_id()),
        });
    }

    fn set_draw_buffers(&mut self, frame_buffer: &ApiObjectRef, draw_buffers: &[DrawBuffer]) {
        self.record(MockCall::SetDrawBuffers {
            frame_buffer: frame_buffer.generic_id(),
            draw_buffers: draw_buffers.to_vec(),
        });
    }

    fn attach(
        &mut self,
        frame_buffer: &ApiObjectRef,
        attachment: FrameBufferAttachment,
        target: &ApiObjectRef,
        kind: AttachmentKind,
    ) {
        self.record(MockCall::Attach {
            frame_buffer: frame_buffer.generic_id(),
            attachment,
            target: target.generic_id(),
            kind,
        });
    }

    fn detach(&mut self, frame_buffer: &ApiObjectRef, attachment: FrameBufferAttachment, kind: AttachmentKind) {
        self.record(MockCall::Detach { frame_buffer: frame_buffer.generic_id(), attachment, kind });
    }

    fn blit(&mut self, request: &BlitRequest) {
        self.record(MockCall::Blit {
            source: request.source.as_ref().map(|fbo| fbo.generic_id()),
            destination: request.destination.as_ref().map(|fbo| fbo.generic_id()),
            source_area: request.source_area,
            destination_area: request.destination_area,
            read_buffer: request.read_buffer,
            mask: request.mask,
            linear_filter: request.linear_filter,
        });
    }

    fn dispatch_compute(&mut self, program: &ApiObjectRef, groups_x: u32, groups_y: u32, groups_z: u32) {
        self.record(MockCall::DispatchCompute {
            program: program.generic_id(),
            groups: (groups_x, groups_y, groups_z),
        });
    }

    fn memory_barrier(&mut self, mask: MemoryBarrierMask) {
        self.record(MockCall::MemoryBarrier(mask));
    }

    fn draw_mesh(&mut self, mesh: &ApiObjectRef, material: &ApiObjectRef, _world: &Mat4, instances: u32) {
        self.record(MockCall::DrawMesh {
            mesh: mesh.generic_id(),
            material: material.generic_id(),
            instances,
        });
    }

    fn draw_full_screen_quad(&mut self, material: &ApiObjectRef) {
        self.record(MockCall::DrawFullScreenQuad { material: material.generic_id() });
    }

    fn read_pixels(&mut self, area: RenderArea, callback: PixelCallback) {
        self.record(MockCall::ReadPixels(area));
        let len = (area.width * area.height * 4) as usize;
        callback(Ok(PixelData { width: area.width, height: area.height, rgba: vec![255; len] }));
    }

    fn read_depth(&mut self, x: u32, y: u32, callback: DepthCallback) {
        self.record(MockCall::ReadDepth { x, y });
        callback(Ok(1.0));
    }
}
