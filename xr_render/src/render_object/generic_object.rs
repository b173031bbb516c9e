/// Generic (backend-agnostic) render objects and their observer links.
///
/// A `GenericRenderObject` describes a GPU resource owned by the scene or
/// material layer. Every renderer realizes it as its own API object; the
/// link table records which caches hold such a realization so that
/// state changes and destruction reach all of them.
///
/// Link lifecycle:
///
/// ```text
///   Live { observers }  --link/unlink-->  Live { observers' }
///   Live { observers }  --destroy()--->   Destroyed   (Destroyed sent once to each observer)
///   Destroyed           --link()------>   rejected (returns false)
/// ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use rustc_hash::FxHashMap;
use super::object_id::ObjectId;
use super::texture::Texture;
use super::frame_buffer::FrameBuffer;
use super::material::{Material, Shader};
use super::mesh::Mesh;

// ===== OBSERVERS =====

/// Identity of an observer (an API object cache, the registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Allocate a process-unique observer id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// State change of a generic render object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericEvent {
    /// Framebuffer targets are about to be replaced
    TargetsChanging,
    /// Framebuffer targets were replaced (TextureTypes/DrawBuffers recomputed)
    TargetsChanged,
    /// Texture storage changed size
    Resized { width: u32, height: u32 },
    /// The object was destroyed; the observer link is already gone
    Destroyed,
}

/// Receiver of generic object events
pub trait RenderObjectObserver: Send + Sync {
    /// Called outside of the object's link lock, on the thread that caused the event
    fn on_generic_event(&self, object: &GenericRenderObject, event: GenericEvent);
}

enum LinkState {
    Live(FxHashMap<ObserverId, Weak<dyn RenderObjectObserver>>),
    Destroyed,
}

// ===== DATA =====

/// Kind-specific payload of a generic render object
#[derive(Debug)]
pub enum RenderObjectData {
    Texture(Texture),
    FrameBuffer(FrameBuffer),
    Material(Material),
    Shader(Shader),
    Mesh(Mesh),
}

/// Discriminant of `RenderObjectData`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderObjectKind {
    Texture,
    FrameBuffer,
    Material,
    Shader,
    Mesh,
}

// ===== GENERIC RENDER OBJECT =====

/// Backend-agnostic description of a GPU resource
///
/// Created through `RenderObjectRegistry`. Equality and hashing use the id only.
pub struct GenericRenderObject {
    id: ObjectId,
    name: String,
    data: RenderObjectData,
    links: Mutex<LinkState>,
}

impl GenericRenderObject {
    pub(crate) fn new(id: ObjectId, name: String, data: RenderObjectData) -> Self {
        Self {
            id,
            name,
            data,
            links: Mutex::new(LinkState::Live(FxHashMap::default())),
        }
    }

    /// Stable identity (cache key)
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of resource described
    pub fn kind(&self) -> RenderObjectKind {
        match &self.data {
            RenderObjectData::Texture(_) => RenderObjectKind::Texture,
            RenderObjectData::FrameBuffer(_) => RenderObjectKind::FrameBuffer,
            RenderObjectData::Material(_) => RenderObjectKind::Material,
            RenderObjectData::Shader(_) => RenderObjectKind::Shader,
            RenderObjectData::Mesh(_) => RenderObjectKind::Mesh,
        }
    }

    /// Kind-specific payload
    pub fn data(&self) -> &RenderObjectData {
        &self.data
    }

    pub fn as_texture(&self) -> Option<&Texture> {
        match &self.data {
            RenderObjectData::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn as_frame_buffer(&self) -> Option<&FrameBuffer> {
        match &self.data {
            RenderObjectData::FrameBuffer(frame_buffer) => Some(frame_buffer),
            _ => None,
        }
    }

    pub fn as_material(&self) -> Option<&Material> {
        match &self.data {
            RenderObjectData::Material(material) => Some(material),
            _ => None,
        }
    }

    pub fn as_shader(&self) -> Option<&Shader> {
        match &self.data {
            RenderObjectData::Shader(shader) => Some(shader),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.data {
            RenderObjectData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// True once `destroy()` has run
    pub fn is_destroyed(&self) -> bool {
        matches!(*self.lock_links(), LinkState::Destroyed)
    }

    /// Register an observer
    ///
    /// Returns false if the object is already destroyed. Re-linking the same
    /// observer id replaces the previous entry.
    pub fn link(&self, observer: ObserverId, target: Weak<dyn RenderObjectObserver>) -> bool {
        match &mut *self.lock_links() {
            LinkState::Live(observers) => {
                observers.insert(observer, target);
                true
            }
            LinkState::Destroyed => false,
        }
    }

    /// Remove an observer. Returns whether it was linked.
    pub fn unlink(&self, observer: ObserverId) -> bool {
        match &mut *self.lock_links() {
            LinkState::Live(observers) => observers.remove(&observer).is_some(),
            LinkState::Destroyed => false,
        }
    }

    /// Number of observers that are still alive
    pub fn linked_count(&self) -> usize {
        match &*self.lock_links() {
            LinkState::Live(observers) => {
                observers.values().filter(|weak| weak.strong_count() > 0).count()
            }
            LinkState::Destroyed => 0,
        }
    }

    /// Deliver an event to every live observer
    pub(crate) fn notify(&self, event: GenericEvent) {
        let observers: Vec<Weak<dyn RenderObjectObserver>> = match &*self.lock_links() {
            LinkState::Live(observers) => observers.values().cloned().collect(),
            LinkState::Destroyed => return,
        };

        for observer in observers {
            if let Some(observer) = observer.upgrade() {
                observer.on_generic_event(self, event);
            }
        }
    }

    /// Destroy the object and propagate to every linked observer
    ///
    /// Returns false if the object was already destroyed.
    pub fn destroy(&self) -> bool {
        let observers = {
            let mut links = self.lock_links();
            match std::mem::replace(&mut *links, LinkState::Destroyed) {
                LinkState::Live(observers) => observers,
                LinkState::Destroyed => return false,
            }
        };

        for observer in observers.into_values() {
            if let Some(observer) = observer.upgrade() {
                observer.on_generic_event(self, GenericEvent::Destroyed);
            }
        }
        true
    }

    fn lock_links(&self) -> std::sync::MutexGuard<'_, LinkState> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for GenericRenderObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GenericRenderObject {}

impl Hash for GenericRenderObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for GenericRenderObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRenderObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}
