/// Backend-specific realization of a generic render object
///
/// Exactly one API object exists per (generic object, renderer) pair; the
/// per-renderer `ApiObjectCache` guarantees it. The GPU resource behind it
/// follows a three-state lifecycle:
///
/// ```text
///   Unrealized --try_begin_generate--> Generating --ok--> Resident
///       ^                                  |                  |
///       +------------- failed -------------+                  |
///       +------------------------- destroy -------------------+
/// ```

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use crate::error::Result;
use crate::engine_warn;
use crate::render_object::{GenericEvent, GenericRenderObject, ObjectId};

/// Native GPU handle (buffer id, texture id, framebuffer id)
pub type NativeHandle = u32;

/// Residency state of an API object's GPU resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResidencyState {
    Unrealized = 0,
    Generating = 1,
    Resident = 2,
}

impl ResidencyState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ResidencyState::Generating,
            2 => ResidencyState::Resident,
            _ => ResidencyState::Unrealized,
        }
    }
}

/// Atomic residency cell embedded in every API object
#[derive(Debug)]
pub struct Residency(AtomicU8);

impl Residency {
    pub fn new() -> Self {
        Self(AtomicU8::new(ResidencyState::Unrealized as u8))
    }

    pub fn state(&self) -> ResidencyState {
        ResidencyState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_resident(&self) -> bool {
        self.state() == ResidencyState::Resident
    }

    /// Claim the right to generate (Unrealized -> Generating)
    pub fn try_begin_generate(&self) -> bool {
        self.0
            .compare_exchange(
                ResidencyState::Unrealized as u8,
                ResidencyState::Generating as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Leave Generating. Returns false if the resource was released meanwhile.
    pub fn finish_generate(&self, success: bool) -> bool {
        let next = if success { ResidencyState::Resident } else { ResidencyState::Unrealized };
        self.0
            .compare_exchange(
                ResidencyState::Generating as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Back to Unrealized. Returns true if the resource was resident.
    pub fn reset(&self) -> bool {
        let previous = self.0.swap(ResidencyState::Unrealized as u8, Ordering::AcqRel);
        ResidencyState::from_u8(previous) == ResidencyState::Resident
    }
}

impl Default for Residency {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend wrapper of a generic render object
///
/// Implemented once per backend and object kind. Callers go through
/// `generate()` / `destroy()` on `dyn ApiRenderObject`, which enforce the
/// residency lifecycle; `generate_resource` and `destroy_resource` only
/// perform the native calls.
pub trait ApiRenderObject: Send + Sync + 'static {
    /// Id of the wrapped generic object
    fn generic_id(&self) -> ObjectId;

    fn residency(&self) -> &Residency;

    /// Native handle, if resident
    fn handle(&self) -> Option<NativeHandle>;

    /// Allocate the native resource
    fn generate_resource(&self) -> Result<()>;

    /// Release the native resource
    fn destroy_resource(&self);

    /// State change of the wrapped generic object (default: ignored)
    fn on_generic_event(&self, _object: &GenericRenderObject, _event: GenericEvent) {}

    /// Upcast for typed access through `ApiObjectCache::generic_to_api`
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl dyn ApiRenderObject {
    pub fn is_generated(&self) -> bool {
        self.residency().is_resident()
    }

    /// Generate the native resource once
    ///
    /// Returns `Ok(true)` if this call generated it, `Ok(false)` if it was
    /// already resident or another caller is generating it.
    pub fn generate(&self) -> Result<bool> {
        if !self.residency().try_begin_generate() {
            return Ok(false);
        }

        match self.generate_resource() {
            Ok(()) => {
                if !self.residency().finish_generate(true) {
                    // Released while generating
                    self.destroy_resource();
                    return Ok(false);
                }
                Ok(true)
            }
            Err(e) => {
                self.residency().finish_generate(false);
                engine_warn!("xr::ApiRenderObject",
                    "Failed to generate resource for {}: {}", self.generic_id(), e);
                Err(e)
            }
        }
    }

    /// Release the native resource if resident
    pub fn destroy(&self) {
        if self.residency().reset() {
            self.destroy_resource();
        }
    }
}

#[cfg(test)]
#[path = "api_object_tests.rs"]
mod tests;
