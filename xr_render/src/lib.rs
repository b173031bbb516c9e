/*!
# XR Render

Core of a real-time 3D renderer, independent of any graphics API.

Scene code describes GPU resources as generic render objects and queues
render commands from an update thread; the render thread swaps the
double-buffered command collection and executes a render pipeline through
a backend implementing `RenderBackend`.

## Architecture

- **RenderObjectRegistry**: creates generic objects with unique identities
- **GenericRenderObject**: API-independent textures, framebuffers, materials, shaders, meshes
- **ApiObjectCache**: lazily realized backend objects, one per generic object per renderer
- **AbstractRenderer**: render areas, framebuffer bind stacks, attachments, draws and readbacks
- **RenderCommandCollection**: per-pass, optionally sorted, double-buffered command queues
- **RenderPipeline**: command chain plus the intermediate resources it renders into
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod render_object;
pub mod render_api;
pub mod renderer;
pub mod commands;
pub mod pipeline;

// Main xr namespace module
pub mod xr {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging facade
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{RendererConfig, PipelineConfig};

    // Renderer facade
    pub use crate::renderer::AbstractRenderer;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Generic render objects
    pub mod object {
        pub use crate::render_object::*;
    }

    // Backend contract and API objects
    pub mod api {
        pub use crate::render_api::*;
    }

    // Renderer, render areas and framebuffer binding
    pub mod render {
        pub use crate::renderer::*;
    }

    // Render commands and collections
    pub mod commands {
        pub use crate::commands::*;
    }

    // Render pipelines
    pub mod pipeline {
        pub use crate::pipeline::*;
    }
}

// Re-export math library at crate root
pub use glam;
