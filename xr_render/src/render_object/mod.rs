/// Generic render objects: backend-agnostic resource descriptions

pub mod object_id;
pub mod generic_object;
pub mod texture;
pub mod frame_buffer;
pub mod material;
pub mod mesh;
pub mod registry;

pub use object_id::ObjectId;
pub use generic_object::{
    GenericRenderObject, RenderObjectData, RenderObjectKind,
    GenericEvent, RenderObjectObserver, ObserverId,
};
pub use texture::{Texture, TextureDesc, TextureKind, TextureFormat, TextureResize};
pub use frame_buffer::{
    FrameBuffer, FrameBufferTarget, FrameBufferAttachment, TextureTypes,
    DrawBuffer, AttachmentKind, CubeFace,
};
pub use material::{Material, Shader, ShaderStage};
pub use mesh::{Mesh, PrimitiveTopology};
pub use registry::{RenderObjectRegistry, MAX_IDENTITY_ATTEMPTS};
