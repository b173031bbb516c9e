/// Render pipelines: command chains, pipeline resources and precomputations

pub mod context;
pub mod command_chain;
pub mod resources;
pub mod quad_frame_buffer;
pub mod render_pipeline;

pub use context::PipelineContext;
pub use command_chain::{
    PipelineCommand, CommandChain, ChainReport, AreaSource, ClearTarget,
    PushRenderAreaCommand, PopRenderAreaCommand, RenderPassCommand,
    BindFrameBufferCommand, UnbindFrameBufferCommand, ClearCommand,
    BlitFrameBufferCommand, CustomCommand,
};
pub use resources::{
    PipelineResources, PipelineTextureKey, TextureScale, RenderSizes,
    ResizeReport, TextureFactory, FrameBufferFactory,
};
pub use quad_frame_buffer::{QuadFrameBuffer, precompute_brdf, BRDF_VERTEX_SHADER, BRDF_FRAGMENT_SHADER};
pub use render_pipeline::RenderPipeline;
