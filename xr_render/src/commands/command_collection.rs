/// Double-buffered, pass-bucketed render command queue
///
/// Two fixed slots hold one `CommandBuffer` each. The update thread adds to
/// the updating slot while the render thread iterates the rendering slot;
/// `swap_buffers` flips the slot index at the frame boundary, fires the
/// per-command swap hooks on the new rendering side and clears the new
/// updating side.
///
/// Ordered buckets insert with `sorter.compare` and break ties with the
/// add sequence number, so commands comparing equal are all kept, in the
/// order they were added.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use crate::{engine_debug, engine_warn};
use crate::renderer::AbstractRenderer;
use super::render_command::{RenderCommand, RenderCommandSorter, RenderPass};
use super::render_info::Renderable;

/// Pass configuration: sorter per pass, None for insertion order
pub type RenderPassSorters = Vec<(RenderPass, Option<Arc<dyn RenderCommandSorter>>)>;

struct QueuedCommand {
    sequence: u64,
    command: Arc<dyn RenderCommand>,
}

struct PassBucket {
    sorter: Option<Arc<dyn RenderCommandSorter>>,
    commands: Vec<QueuedCommand>,
}

impl PassBucket {
    fn insert(&mut self, queued: QueuedCommand) {
        match &self.sorter {
            Some(sorter) => {
                let index = self.commands.partition_point(|existing| {
                    sorter
                        .compare(existing.command.as_ref(), queued.command.as_ref())
                        .then(existing.sequence.cmp(&queued.sequence))
                        == CmpOrdering::Less
                });
                self.commands.insert(index, queued);
            }
            None => self.commands.push(queued),
        }
    }
}

#[derive(Default)]
struct CommandBuffer {
    passes: BTreeMap<RenderPass, PassBucket>,
}

impl CommandBuffer {
    fn configure(passes: &RenderPassSorters) -> Self {
        let passes = passes
            .iter()
            .map(|(pass, sorter)| (*pass, PassBucket { sorter: sorter.clone(), commands: Vec::new() }))
            .collect();
        Self { passes }
    }

    fn clear(&mut self) {
        for bucket in self.passes.values_mut() {
            bucket.commands.clear();
        }
    }

    fn commands(&self) -> impl Iterator<Item = &Arc<dyn RenderCommand>> {
        self.passes.values().flat_map(|bucket| bucket.commands.iter().map(|queued| &queued.command))
    }
}

pub struct RenderCommandCollection {
    buffers: [Mutex<CommandBuffer>; 2],
    updating: AtomicUsize,
    sequence: AtomicU64,
}

impl RenderCommandCollection {
    /// Collection with no pass configured (every add is ignored)
    pub fn new() -> Self {
        Self {
            buffers: [Mutex::new(CommandBuffer::default()), Mutex::new(CommandBuffer::default())],
            updating: AtomicUsize::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn with_render_passes(passes: RenderPassSorters) -> Self {
        let collection = Self::new();
        collection.set_render_passes(passes);
        collection
    }

    /// Declare the valid passes and their ordering
    ///
    /// Replaces any previous configuration and drops queued commands on
    /// both sides.
    pub fn set_render_passes(&self, passes: RenderPassSorters) {
        for buffer in &self.buffers {
            *lock(buffer) = CommandBuffer::configure(&passes);
        }
        engine_debug!("xr::RenderCommandCollection", "Configured {} render passes", passes.len());
    }

    pub fn render_passes(&self) -> Vec<RenderPass> {
        lock(self.updating_buffer()).passes.keys().copied().collect()
    }

    pub fn is_configured(&self, pass: RenderPass) -> bool {
        lock(self.updating_buffer()).passes.contains_key(&pass)
    }

    /// Queue a command on the updating side
    ///
    /// Returns false (and logs) if its pass was never configured.
    pub fn add(&self, command: Arc<dyn RenderCommand>) -> bool {
        let pass = command.render_pass();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        let mut buffer = lock(self.updating_buffer());
        match buffer.passes.get_mut(&pass) {
            Some(bucket) => {
                bucket.insert(QueuedCommand { sequence, command });
                true
            }
            None => {
                engine_warn!("xr::RenderCommandCollection", "Render pass {} is not configured, command dropped", pass);
                false
            }
        }
    }

    /// Queue the command of every visible render info. Returns how many were queued.
    pub fn add_renderable(&self, renderable: &dyn Renderable) -> usize {
        renderable
            .render_infos()
            .iter()
            .filter(|info| info.is_visible())
            .filter(|info| self.add(info.command().clone()))
            .count()
    }

    /// Render the rendering side of `pass` in bucket order
    ///
    /// Render thread only. A failing command is logged and the next one
    /// still runs. Returns the number of commands rendered.
    pub fn render(&self, pass: RenderPass, renderer: &mut AbstractRenderer) -> usize {
        let commands: Vec<Arc<dyn RenderCommand>> = {
            let buffer = lock(self.rendering_buffer());
            let Some(bucket) = buffer.passes.get(&pass) else {
                engine_debug!("xr::RenderCommandCollection", "Render of unconfigured pass {}", pass);
                return 0;
            };
            bucket.commands.iter().map(|queued| queued.command.clone()).collect()
        };

        let mut rendered = 0;
        for command in commands.iter().filter(|command| command.is_enabled()) {
            match command.render(renderer) {
                Ok(()) => rendered += 1,
                Err(e) => engine_warn!("xr::RenderCommandCollection", "Command in pass {} failed: {}", pass, e),
            }
        }
        rendered
    }

    /// Fire `pre_render` on every rendering-side command
    pub fn pre_render(&self) {
        let buffer = lock(self.rendering_buffer());
        for command in buffer.commands() {
            command.pre_render();
        }
    }

    /// Frame boundary: flip sides, fire swap hooks, clear the new updating side
    ///
    /// Must not run concurrently with `add` or `render`.
    pub fn swap_buffers(&self) {
        let rendering = self.updating.fetch_xor(1, Ordering::AcqRel);
        let updating = rendering ^ 1;

        {
            let buffer = lock(&self.buffers[rendering]);
            for command in buffer.commands() {
                command.swap_buffers();
            }
        }
        lock(&self.buffers[updating]).clear();
    }

    /// Commands queued on the updating side of `pass`
    pub fn updating_count(&self, pass: RenderPass) -> usize {
        lock(self.updating_buffer()).passes.get(&pass).map_or(0, |bucket| bucket.commands.len())
    }

    /// Commands on the rendering side of `pass`
    pub fn rendering_count(&self, pass: RenderPass) -> usize {
        lock(self.rendering_buffer()).passes.get(&pass).map_or(0, |bucket| bucket.commands.len())
    }

    fn updating_buffer(&self) -> &Mutex<CommandBuffer> {
        &self.buffers[self.updating.load(Ordering::Acquire)]
    }

    fn rendering_buffer(&self) -> &Mutex<CommandBuffer> {
        &self.buffers[self.updating.load(Ordering::Acquire) ^ 1]
    }
}

impl Default for RenderCommandCollection {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(buffer: &Mutex<CommandBuffer>) -> MutexGuard<'_, CommandBuffer> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "command_collection_tests.rs"]
mod tests;
