/// Pipeline command chain
///
/// A render pipeline is a flat list of stage commands executed in order
/// each frame. Scoped builders (`with_render_area`, `with_frame_buffer`)
/// emit matching push/pop pairs around the nested stages.

use std::sync::Arc;
use glam::Vec4;
use crate::engine_warn;
use crate::error::{Error, Result};
use crate::commands::RenderPass;
use crate::render_api::ReadBufferMode;
use crate::render_object::{GenericRenderObject, TextureTypes};
use crate::renderer::{BindRole, RenderArea};
use super::context::PipelineContext;

/// One stage of a pipeline
pub trait PipelineCommand: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    fn execute(&mut self, ctx: &mut PipelineContext<'_>) -> Result<()>;
}

fn frame_buffer<'c>(ctx: &'c PipelineContext<'_>, name: &str) -> Result<&'c Arc<GenericRenderObject>> {
    ctx.resources
        .frame_buffer(name)
        .ok_or_else(|| Error::InvalidResource(format!("no pipeline framebuffer '{}'", name)))
}

// ===== RENDER AREA =====

/// Where a pushed render area takes its size from
#[derive(Debug, Clone, PartialEq)]
pub enum AreaSource {
    Internal,
    Full,
    Fixed(RenderArea),
    /// Size of a named pipeline framebuffer
    FrameBuffer(String),
}

impl AreaSource {
    pub fn resolve(&self, ctx: &PipelineContext<'_>) -> Result<RenderArea> {
        match self {
            AreaSource::Internal => Ok(RenderArea::from_size(ctx.internal_size())),
            AreaSource::Full => Ok(RenderArea::from_size(ctx.full_size())),
            AreaSource::Fixed(area) => Ok(*area),
            AreaSource::FrameBuffer(name) => frame_buffer(ctx, name)?
                .as_frame_buffer()
                .and_then(|fb| fb.size())
                .map(RenderArea::from_size)
                .ok_or_else(|| Error::InvalidResource(format!("framebuffer '{}' has no sized target", name))),
        }
    }
}

pub struct PushRenderAreaCommand {
    source: AreaSource,
}

impl PushRenderAreaCommand {
    pub fn new(source: AreaSource) -> Self {
        Self { source }
    }
}

impl PipelineCommand for PushRenderAreaCommand {
    fn name(&self) -> &str {
        "PushRenderArea"
    }

    fn execute(&mut self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        let area = self.source.resolve(ctx)?;
        ctx.push_render_area(area);
        Ok(())
    }
}

pub struct PopRenderAreaCommand;

impl PipelineCommand for PopRenderAreaCommand {
    fn name(&self) -> &str {
        "PopRenderArea"
    }

    fn execute(&mut self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        ctx.pop_render_area();
        Ok(())
    }
}

// ===== RENDER PASS =====

/// Render every queued command of one pass
pub struct RenderPassCommand {
    pass: RenderPass,
}

impl RenderPassCommand {
    pub fn new(pass: RenderPass) -> Self {
        Self { pass }
    }

    pub fn pass(&self) -> RenderPass {
        self.pass
    }
}

impl PipelineCommand for RenderPassCommand {
    fn name(&self) -> &str {
        "RenderPass"
    }

    fn execute(&mut self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        ctx.commands.render(self.pass, &mut *ctx.renderer);
        Ok(())
    }
}

// ===== FRAMEBUFFER =====

pub struct BindFrameBufferCommand {
    frame_buffer: String,
    role: BindRole,
}

impl BindFrameBufferCommand {
    pub fn new(frame_buffer: &str, role: BindRole) -> Self {
        Self { frame_buffer: frame_buffer.to_string(), role }
    }
}

impl PipelineCommand for BindFrameBufferCommand {
    fn name(&self) -> &str {
        "BindFrameBuffer"
    }

    fn execute(&mut self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        let target = frame_buffer(ctx, &self.frame_buffer)?.clone();
        if !ctx.bind_frame_buffer(&target, self.role) {
            return Err(Error::InvalidResource(format!("framebuffer '{}' can't be bound", self.frame_buffer)));
        }
        Ok(())
    }
}

pub struct UnbindFrameBufferCommand {
    frame_buffer: String,
    role: BindRole,
}

impl UnbindFrameBufferCommand {
    pub fn new(frame_buffer: &str, role: BindRole) -> Self {
        Self { frame_buffer: frame_buffer.to_string(), role }
    }
}

impl PipelineCommand for UnbindFrameBufferCommand {
    fn name(&self) -> &str {
        "UnbindFrameBuffer"
    }

    fn execute(&mut self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        let target = frame_buffer(ctx, &self.frame_buffer)?.clone();
        ctx.unbind_frame_buffer(&target, self.role);
        Ok(())
    }
}

// ===== CLEAR =====

/// Which buffers a clear touches
#[derive(Debug, Clone, PartialEq)]
pub enum ClearTarget {
    Buffers(TextureTypes),
    /// Whatever the named framebuffer has attached
    FrameBuffer(String),
}

pub struct ClearCommand {
    target: ClearTarget,
    color: Option<Vec4>,
}

impl ClearCommand {
    pub fn new(buffers: TextureTypes) -> Self {
        Self { target: ClearTarget::Buffers(buffers), color: None }
    }

    pub fn for_frame_buffer(name: &str) -> Self {
        Self { target: ClearTarget::FrameBuffer(name.to_string()), color: None }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = Some(color);
        self
    }
}

impl PipelineCommand for ClearCommand {
    fn name(&self) -> &str {
        "Clear"
    }

    fn execute(&mut self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        let buffers = match &self.target {
            ClearTarget::Buffers(buffers) => *buffers,
            ClearTarget::FrameBuffer(name) => frame_buffer(ctx, name)?
                .as_frame_buffer()
                .map(|fb| fb.texture_types())
                .unwrap_or_default(),
        };
        if buffers.is_empty() {
            return Ok(());
        }
        if let Some(color) = self.color {
            ctx.renderer.set_clear_color(color);
        }
        ctx.renderer.clear(
            buffers.contains(TextureTypes::COLOR),
            buffers.contains(TextureTypes::DEPTH),
            buffers.contains(TextureTypes::STENCIL),
        );
        Ok(())
    }
}

// ===== BLIT =====

/// Copy between two pipeline framebuffers (None = default framebuffer)
///
/// Areas cover the whole framebuffer; the default framebuffer uses the
/// full resolution.
pub struct BlitFrameBufferCommand {
    source: Option<String>,
    destination: Option<String>,
    buffers: TextureTypes,
    read_buffer: ReadBufferMode,
    linear_filter: bool,
}

impl BlitFrameBufferCommand {
    pub fn new(source: Option<&str>, destination: Option<&str>, buffers: TextureTypes) -> Self {
        Self {
            source: source.map(str::to_string),
            destination: destination.map(str::to_string),
            buffers,
            read_buffer: ReadBufferMode::ColorAttachment(0),
            linear_filter: false,
        }
    }

    pub fn with_read_buffer(mut self, read_buffer: ReadBufferMode) -> Self {
        self.read_buffer = read_buffer;
        self
    }

    pub fn with_linear_filter(mut self, linear_filter: bool) -> Self {
        self.linear_filter = linear_filter;
        self
    }

    fn endpoint(
        ctx: &PipelineContext<'_>,
        name: Option<&String>,
    ) -> Result<(Option<Arc<GenericRenderObject>>, RenderArea)> {
        let Some(name) = name else {
            return Ok((None, RenderArea::from_size(ctx.full_size())));
        };
        let target = frame_buffer(ctx, name)?.clone();
        let area = target
            .as_frame_buffer()
            .and_then(|fb| fb.size())
            .map(RenderArea::from_size)
            .unwrap_or_else(|| RenderArea::from_size(ctx.full_size()));
        Ok((Some(target), area))
    }
}

impl PipelineCommand for BlitFrameBufferCommand {
    fn name(&self) -> &str {
        "BlitFrameBuffer"
    }

    fn execute(&mut self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        let (source, source_area) = Self::endpoint(ctx, self.source.as_ref())?;
        let (destination, destination_area) = Self::endpoint(ctx, self.destination.as_ref())?;
        let done = ctx.renderer.blit(
            source.as_ref(),
            destination.as_ref(),
            source_area,
            destination_area,
            self.read_buffer,
            self.buffers.contains(TextureTypes::COLOR),
            self.buffers.contains(TextureTypes::DEPTH),
            self.buffers.contains(TextureTypes::STENCIL),
            self.linear_filter,
        );
        if !done {
            return Err(Error::BackendError("blit skipped".to_string()));
        }
        Ok(())
    }
}

// ===== CUSTOM =====

/// Stage running a user closure
pub struct CustomCommand {
    name: String,
    callback: Box<dyn FnMut(&mut PipelineContext<'_>) -> Result<()> + Send + Sync>,
}

impl CustomCommand {
    pub fn new<F>(name: &str, callback: F) -> Self
    where
        F: FnMut(&mut PipelineContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            callback: Box::new(callback),
        }
    }
}

impl PipelineCommand for CustomCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        (self.callback)(ctx)
    }
}

// ===== CHAIN =====

/// Outcome of one chain execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainReport {
    pub executed: usize,
    pub failed: usize,
    /// Render areas left open by the stages and popped afterwards
    pub released_areas: usize,
    /// Framebuffer binds left open by the stages and released afterwards
    pub released_binds: usize,
}

#[derive(Default)]
pub struct CommandChain {
    commands: Vec<Box<dyn PipelineCommand>>,
}

impl CommandChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<C: PipelineCommand + 'static>(&mut self, command: C) -> &mut Self {
        self.commands.push(Box::new(command));
        self
    }

    pub fn add_boxed(&mut self, command: Box<dyn PipelineCommand>) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Emit `build`'s stages between a push and a pop of `source`
    pub fn with_render_area<F>(&mut self, source: AreaSource, build: F) -> &mut Self
    where
        F: FnOnce(&mut CommandChain),
    {
        self.add(PushRenderAreaCommand::new(source));
        build(self);
        self.add(PopRenderAreaCommand)
    }

    /// Emit `build`'s stages between a bind and an unbind of `frame_buffer`
    pub fn with_frame_buffer<F>(&mut self, frame_buffer: &str, role: BindRole, build: F) -> &mut Self
    where
        F: FnOnce(&mut CommandChain),
    {
        self.add(BindFrameBufferCommand::new(frame_buffer, role));
        build(self);
        self.add(UnbindFrameBufferCommand::new(frame_buffer, role))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|command| command.name()).collect()
    }

    /// Run every stage in order
    ///
    /// A failing stage is logged and the chain continues. Areas and binds
    /// still open at the end are released.
    pub fn execute(&mut self, ctx: &mut PipelineContext<'_>) -> ChainReport {
        let mut report = ChainReport::default();

        for (index, command) in self.commands.iter_mut().enumerate() {
            report.executed += 1;
            if let Err(e) = command.execute(ctx) {
                report.failed += 1;
                engine_warn!("xr::CommandChain", "Stage {} ({}) failed: {}", index, command.name(), e);
            }
        }

        let (areas, binds) = ctx.release_open();
        if areas > 0 || binds > 0 {
            engine_warn!("xr::CommandChain",
                "Chain left {} render area(s) and {} framebuffer bind(s) open; released", areas, binds);
        }
        report.released_areas = areas;
        report.released_binds = binds;
        report
    }
}

#[cfg(test)]
#[path = "command_chain_tests.rs"]
mod tests;
