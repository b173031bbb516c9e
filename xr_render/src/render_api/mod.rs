/// Render API layer: backend contract, API objects and the per-renderer cache

pub mod api_object;
pub mod object_cache;
pub mod backend;

#[cfg(test)]
pub mod mock_backend;

pub use api_object::{ApiRenderObject, NativeHandle, Residency, ResidencyState};
pub use object_cache::{ApiObjectCache, ApiObjectFactory};
pub use backend::{
    RenderBackend, BackendCapabilities, GpuVendor, ApiObjectRef,
    FrameBufferBindTarget, ReadBufferMode, BlitMask, BlitRequest,
    MemoryBarrierMask, PixelData, PixelCallback, DepthCallback,
};
