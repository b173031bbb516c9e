/// Renderer module - per-window facade, render areas and framebuffer binding

pub mod render_area;
pub mod frame_buffer_binding;
pub mod renderer;

pub use render_area::{RenderArea, RenderAreaStack};
pub use frame_buffer_binding::{BindRole, BindTransition, FrameBufferBindStacks};
pub use renderer::{AbstractRenderer, RendererStats, RenderAreaScope, FrameBufferScope};
