/// Per-renderer cache of API objects, keyed by generic object id
///
/// The cache is the only structure of a renderer touched from many threads
/// (first-use resolution while enqueueing draw work). One mutex covers the
/// lookup, factory creation, observer registration and optional generation,
/// so two threads resolving the same unseen generic object get the same
/// wrapper and the resource is generated once.
///
/// Each entry is linked to its generic object as an observer: destroying
/// the generic object removes the entry and releases the wrapper; a target
/// change on a framebuffer marks the entry for re-attachment and remembers
/// the targets still attached on the GPU so they can be detached first.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use rustc_hash::FxHashMap;
use crate::{engine_debug, engine_warn};
use crate::render_object::{
    FrameBufferTarget, GenericEvent, GenericRenderObject, ObjectId, ObserverId, RenderObjectObserver,
};
use super::api_object::ApiRenderObject;

/// Creates backend wrappers for generic objects
pub trait ApiObjectFactory: Send + Sync {
    /// None if the backend has no wrapper for this object kind
    fn create_api_object(&self, generic: &Arc<GenericRenderObject>) -> Option<Arc<dyn ApiRenderObject>>;
}

struct CacheEntry {
    generic: Weak<GenericRenderObject>,
    api: Arc<dyn ApiRenderObject>,
    targets_dirty: AtomicBool,
    /// Targets attached on the GPU before the last pending change
    attached_targets: Vec<FrameBufferTarget>,
}

pub struct ApiObjectCache {
    observer_id: ObserverId,
    self_ref: Weak<ApiObjectCache>,
    factory: Arc<dyn ApiObjectFactory>,
    entries: Mutex<FxHashMap<ObjectId, CacheEntry>>,
}

impl ApiObjectCache {
    pub fn new(factory: Arc<dyn ApiObjectFactory>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            observer_id: ObserverId::next(),
            self_ref: weak.clone(),
            factory,
            entries: Mutex::new(FxHashMap::default()),
        })
    }

    /// Wrapper for `generic`, created on first access
    ///
    /// With `generate_now`, the native resource is generated before
    /// returning if it isn't resident yet. Returns None for destroyed
    /// objects and kinds the backend doesn't wrap.
    pub fn get_or_create(
        &self,
        generic: &Arc<GenericRenderObject>,
        generate_now: bool,
    ) -> Option<Arc<dyn ApiRenderObject>> {
        let mut entries = self.lock_entries();

        let api = match entries.get(&generic.id()) {
            Some(entry) => entry.api.clone(),
            None => {
                if generic.is_destroyed() {
                    engine_debug!("xr::ApiObjectCache", "Ignoring destroyed object '{}'", generic.name());
                    return None;
                }
                let Some(api) = self.factory.create_api_object(generic) else {
                    engine_warn!("xr::ApiObjectCache",
                        "No API object for {:?} '{}'", generic.kind(), generic.name());
                    return None;
                };
                let observer: Weak<dyn RenderObjectObserver> = self.self_ref.clone();
                if !generic.link(self.observer_id, observer) {
                    return None;
                }
                entries.insert(generic.id(), CacheEntry {
                    generic: Arc::downgrade(generic),
                    api: api.clone(),
                    targets_dirty: AtomicBool::new(true),
                    attached_targets: Vec::new(),
                });
                api
            }
        };

        if generate_now && !api.is_generated() {
            // Failure is logged by generate(); the wrapper stays non-resident
            let _ = api.generate();
        }
        Some(api)
    }

    /// Non-creating lookup
    pub fn try_get(&self, id: ObjectId) -> Option<Arc<dyn ApiRenderObject>> {
        self.lock_entries().get(&id).map(|entry| entry.api.clone())
    }

    /// Typed wrapper for `generic`; None if it exists with another concrete type
    pub fn generic_to_api<T: ApiRenderObject>(
        &self,
        generic: &Arc<GenericRenderObject>,
        generate_now: bool,
    ) -> Option<Arc<T>> {
        let api = self.get_or_create(generic, generate_now)?;
        let any: Arc<dyn Any + Send + Sync> = api.into_any();
        any.downcast::<T>().ok()
    }

    /// Create wrappers (without generating) for objects not cached yet
    ///
    /// Returns the number of wrappers created.
    pub fn materialize(&self, objects: &[Arc<GenericRenderObject>]) -> usize {
        objects
            .iter()
            .filter(|object| self.try_get(object.id()).is_none())
            .filter(|object| self.get_or_create(object, false).is_some())
            .count()
    }

    /// Remove one entry, unlink it and release its wrapper
    pub fn evict(&self, id: ObjectId) -> bool {
        let Some(entry) = self.lock_entries().remove(&id) else {
            return false;
        };
        self.release(entry);
        true
    }

    /// Evict every entry. Returns how many were evicted.
    pub fn clear(&self) -> usize {
        let drained: Vec<CacheEntry> = self.lock_entries().drain().map(|(_, entry)| entry).collect();
        let count = drained.len();
        for entry in drained {
            self.release(entry);
        }
        count
    }

    /// Consume the pending target-refresh flag of a framebuffer entry
    ///
    /// When a refresh is pending, returns the targets that were attached
    /// before the change (empty if none were ever attached).
    pub fn take_target_refresh(&self, id: ObjectId) -> Option<Vec<FrameBufferTarget>> {
        let mut entries = self.lock_entries();
        let entry = entries.get_mut(&id)?;
        if !entry.targets_dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        Some(std::mem::take(&mut entry.attached_targets))
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, entry: CacheEntry) {
        if let Some(generic) = entry.generic.upgrade() {
            generic.unlink(self.observer_id);
        }
        entry.api.destroy();
    }

    fn lock_entries(&self) -> MutexGuard<'_, FxHashMap<ObjectId, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderObjectObserver for ApiObjectCache {
    fn on_generic_event(&self, object: &GenericRenderObject, event: GenericEvent) {
        match event {
            GenericEvent::Destroyed => {
                let removed = self.lock_entries().remove(&object.id());
                if let Some(entry) = removed {
                    entry.api.on_generic_event(object, event);
                    entry.api.destroy();
                }
            }
            _ => {
                let api = {
                    let mut entries = self.lock_entries();
                    let Some(entry) = entries.get_mut(&object.id()) else {
                        return;
                    };
                    match event {
                        // Targets not refreshed yet were never attached; keep the older snapshot
                        GenericEvent::TargetsChanging if !entry.targets_dirty.load(Ordering::Acquire) => {
                            entry.attached_targets = object
                                .as_frame_buffer()
                                .map(|fb| fb.targets())
                                .unwrap_or_default();
                        }
                        GenericEvent::TargetsChanged => entry.targets_dirty.store(true, Ordering::Release),
                        _ => {}
                    }
                    entry.api.clone()
                };
                api.on_generic_event(object, event);
            }
        }
    }
}

#[cfg(test)]
#[path = "object_cache_tests.rs"]
mod tests;
