/// Render commands and the double-buffered command collection

pub mod render_command;
pub mod command_collection;
pub mod render_info;
pub mod mesh_command;

pub use render_command::{
    RenderCommand, RenderPass, SortKey, RenderCommandSorter,
    NearToFarRenderCommandSorter, FarToNearRenderCommandSorter,
};
pub use command_collection::{RenderCommandCollection, RenderPassSorters};
pub use render_info::{RenderInfo, Renderable};
pub use mesh_command::{MeshRenderCommand, MethodRenderCommand, RenderMethod};
