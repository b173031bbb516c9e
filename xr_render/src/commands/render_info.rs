/// Render infos: the link between scene objects and their render commands

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use super::render_command::{RenderCommand, RenderPass};

/// One command contributed by a renderable, with its visibility
pub struct RenderInfo {
    command: Arc<dyn RenderCommand>,
    visible: AtomicBool,
}

impl RenderInfo {
    pub fn new(command: Arc<dyn RenderCommand>) -> Self {
        Self { command, visible: AtomicBool::new(true) }
    }

    pub fn command(&self) -> &Arc<dyn RenderCommand> {
        &self.command
    }

    pub fn render_pass(&self) -> RenderPass {
        self.command.render_pass()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    /// Culling result for the current frame
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }
}

/// Anything contributing draw work
pub trait Renderable: Send + Sync {
    fn render_infos(&self) -> &[RenderInfo];
}
