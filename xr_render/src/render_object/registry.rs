/// Registry of live generic render objects
///
/// Allocates collision-free identities and tracks every object that has
/// not been destroyed, so a newly created renderer can realize them all.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_error};
use super::frame_buffer::{FrameBuffer, FrameBufferTarget};
use super::generic_object::{
    GenericEvent, GenericRenderObject, ObserverId, RenderObjectData, RenderObjectObserver,
};
use super::material::{Material, Shader, ShaderStage};
use super::mesh::Mesh;
use super::object_id::ObjectId;
use super::texture::{Texture, TextureDesc};

/// Identity draws before creation gives up
pub const MAX_IDENTITY_ATTEMPTS: u32 = 8;

type IdSource = Box<dyn FnMut() -> ObjectId + Send>;

pub struct RenderObjectRegistry {
    observer_id: ObserverId,
    self_ref: Weak<RenderObjectRegistry>,
    objects: Mutex<FxHashMap<ObjectId, Weak<GenericRenderObject>>>,
    id_source: Mutex<IdSource>,
}

impl RenderObjectRegistry {
    /// Registry drawing random v4 UUIDs
    pub fn new() -> Arc<Self> {
        Self::with_id_source(ObjectId::new)
    }

    /// Registry drawing ids from a custom source
    pub fn with_id_source<F>(source: F) -> Arc<Self>
    where
        F: FnMut() -> ObjectId + Send + 'static,
    {
        Arc::new_cyclic(|weak| Self {
            observer_id: ObserverId::next(),
            self_ref: weak.clone(),
            objects: Mutex::new(FxHashMap::default()),
            id_source: Mutex::new(Box::new(source)),
        })
    }

    /// Create and register a generic object
    ///
    /// Draws ids until one is not held by a live object, at most
    /// `MAX_IDENTITY_ATTEMPTS` times.
    pub fn create(&self, name: &str, data: RenderObjectData) -> Result<Arc<GenericRenderObject>> {
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);

        let id = {
            let mut source = self.id_source.lock().unwrap_or_else(PoisonError::into_inner);
            let mut found = None;
            for attempt in 1..=MAX_IDENTITY_ATTEMPTS {
                let candidate = (*source)();
                let taken = objects
                    .get(&candidate)
                    .map_or(false, |existing| existing.strong_count() > 0);
                if !taken {
                    found = Some(candidate);
                    break;
                }
                engine_debug!("xr::RenderObjectRegistry",
                    "Id collision for '{}' (attempt {}/{}), retrying", name, attempt, MAX_IDENTITY_ATTEMPTS);
            }
            match found {
                Some(id) => id,
                None => {
                    engine_error!("xr::RenderObjectRegistry",
                        "Could not allocate a unique id for '{}' after {} attempts", name, MAX_IDENTITY_ATTEMPTS);
                    return Err(Error::IdentityExhausted(MAX_IDENTITY_ATTEMPTS));
                }
            }
        };

        let object = Arc::new(GenericRenderObject::new(id, name.to_string(), data));
        let observer: Weak<dyn RenderObjectObserver> = self.self_ref.clone();
        object.link(self.observer_id, observer);
        objects.insert(id, Arc::downgrade(&object));

        engine_debug!("xr::RenderObjectRegistry", "Created {:?} '{}' ({})", object.kind(), name, id);
        Ok(object)
    }

    pub fn create_texture(&self, name: &str, desc: TextureDesc) -> Result<Arc<GenericRenderObject>> {
        self.create(name, RenderObjectData::Texture(Texture::new(desc)))
    }

    pub fn create_frame_buffer(
        &self,
        name: &str,
        targets: Vec<FrameBufferTarget>,
    ) -> Result<Arc<GenericRenderObject>> {
        self.create(name, RenderObjectData::FrameBuffer(FrameBuffer::new(targets)))
    }

    pub fn create_shader(
        &self,
        name: &str,
        stage: ShaderStage,
        source_name: &str,
    ) -> Result<Arc<GenericRenderObject>> {
        self.create(name, RenderObjectData::Shader(Shader::new(stage, source_name)))
    }

    pub fn create_material(
        &self,
        name: &str,
        shaders: Vec<Arc<GenericRenderObject>>,
        textures: Vec<Arc<GenericRenderObject>>,
    ) -> Result<Arc<GenericRenderObject>> {
        self.create(name, RenderObjectData::Material(Material::new(shaders, textures)))
    }

    pub fn create_mesh(&self, name: &str, mesh: Mesh) -> Result<Arc<GenericRenderObject>> {
        self.create(name, RenderObjectData::Mesh(mesh))
    }

    /// Live object by id
    pub fn get(&self, id: ObjectId) -> Option<Arc<GenericRenderObject>> {
        self.lock_objects().get(&id).and_then(Weak::upgrade)
    }

    /// Every object that is alive and not destroyed
    pub fn live_objects(&self) -> Vec<Arc<GenericRenderObject>> {
        let mut objects = self.lock_objects();
        objects.retain(|_, weak| weak.strong_count() > 0);
        objects
            .values()
            .filter_map(Weak::upgrade)
            .filter(|object| !object.is_destroyed())
            .collect()
    }

    /// Number of tracked objects
    pub fn len(&self) -> usize {
        self.lock_objects().values().filter(|weak| weak.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, FxHashMap<ObjectId, Weak<GenericRenderObject>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderObjectObserver for RenderObjectRegistry {
    fn on_generic_event(&self, object: &GenericRenderObject, event: GenericEvent) {
        if event == GenericEvent::Destroyed {
            self.lock_objects().remove(&object.id());
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
