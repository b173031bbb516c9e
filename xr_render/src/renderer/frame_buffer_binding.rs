/// Framebuffer bind stacks (read, write, general)
///
/// Each role keeps its own stack so a framebuffer can be bound for reading
/// while another is bound for writing. The stacks only compute the
/// transition; the renderer applies it to the backend.
///
/// ```text
///   bind(A)            [A]      -> Bind(A)
///   bind(B)            [A, B]   -> Bind(B)
///   unbind(A)          [A, B]   -> None     (A is not on top)
///   unbind(B)          [A]      -> Bind(A)  (restore previous)
///   unbind(A)          []       -> Unbind   (default framebuffer)
///   unbind(A)          []       -> None
/// ```

use std::sync::Arc;
use crate::engine_debug;
use crate::render_api::FrameBufferBindTarget;
use crate::render_object::GenericRenderObject;

/// Binding role of a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindRole {
    Read,
    Write,
    General,
}

impl BindRole {
    pub const ALL: [BindRole; 3] = [BindRole::Read, BindRole::Write, BindRole::General];

    pub fn bind_target(&self) -> FrameBufferBindTarget {
        match self {
            BindRole::Read => FrameBufferBindTarget::ReadFramebuffer,
            BindRole::Write => FrameBufferBindTarget::DrawFramebuffer,
            BindRole::General => FrameBufferBindTarget::Framebuffer,
        }
    }

    fn index(&self) -> usize {
        match self {
            BindRole::Read => 0,
            BindRole::Write => 1,
            BindRole::General => 2,
        }
    }
}

/// Backend call implied by a stack operation
#[derive(Debug, Clone)]
pub enum BindTransition {
    /// Bind this framebuffer to the role's target
    Bind(Arc<GenericRenderObject>),
    /// Bind the default framebuffer
    Unbind,
    /// Nothing to do
    None,
}

#[derive(Debug, Default)]
pub struct FrameBufferBindStacks {
    stacks: [Vec<Arc<GenericRenderObject>>; 3],
}

impl FrameBufferBindStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: BindRole, frame_buffer: Arc<GenericRenderObject>) -> BindTransition {
        self.stacks[role.index()].push(frame_buffer.clone());
        BindTransition::Bind(frame_buffer)
    }

    /// Pop `frame_buffer` if it is on top of the role's stack
    ///
    /// The nearest live entry below becomes current; destroyed entries
    /// uncovered by the pop are discarded.
    pub fn pop(&mut self, role: BindRole, frame_buffer: &GenericRenderObject) -> BindTransition {
        let stack = &mut self.stacks[role.index()];
        match stack.last() {
            Some(top) if top.id() == frame_buffer.id() => {}
            Some(top) => {
                engine_debug!("xr::FrameBufferBindStacks",
                    "Ignoring {:?} unbind of '{}', '{}' is bound", role, frame_buffer.name(), top.name());
                return BindTransition::None;
            }
            None => return BindTransition::None,
        }

        stack.pop();
        // Framebuffers destroyed while covered can't be restored
        while let Some(previous) = stack.last() {
            if !previous.is_destroyed() {
                break;
            }
            engine_debug!("xr::FrameBufferBindStacks",
                "Dropping destroyed '{}' from the {:?} stack", previous.name(), role);
            stack.pop();
        }
        match stack.last() {
            Some(previous) => BindTransition::Bind(previous.clone()),
            None => BindTransition::Unbind,
        }
    }

    pub fn current(&self, role: BindRole) -> Option<&Arc<GenericRenderObject>> {
        self.stacks[role.index()].last()
    }

    pub fn depth(&self, role: BindRole) -> usize {
        self.stacks[role.index()].len()
    }

    /// Empty every stack (renderer clean-up)
    pub fn clear(&mut self) {
        for stack in &mut self.stacks {
            stack.clear();
        }
    }
}

#[cfg(test)]
#[path = "frame_buffer_binding_tests.rs"]
mod tests;
