/// Generic shaders and materials

use std::sync::Arc;
use super::generic_object::GenericRenderObject;

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

/// Generic shader
///
/// `source_name` refers to an asset resolved by the backend (shader
/// loading and compilation belong to the backend).
#[derive(Debug, Clone)]
pub struct Shader {
    stage: ShaderStage,
    source_name: String,
}

impl Shader {
    pub fn new(stage: ShaderStage, source_name: impl Into<String>) -> Self {
        Self { stage, source_name: source_name.into() }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }
}

/// Generic material: shaders plus sampled textures
#[derive(Debug, Clone, Default)]
pub struct Material {
    shaders: Vec<Arc<GenericRenderObject>>,
    textures: Vec<Arc<GenericRenderObject>>,
}

impl Material {
    pub fn new(shaders: Vec<Arc<GenericRenderObject>>, textures: Vec<Arc<GenericRenderObject>>) -> Self {
        Self { shaders, textures }
    }

    pub fn shaders(&self) -> &[Arc<GenericRenderObject>] {
        &self.shaders
    }

    pub fn textures(&self) -> &[Arc<GenericRenderObject>] {
        &self.textures
    }

    /// First shader of the given stage
    pub fn shader(&self, stage: ShaderStage) -> Option<&Arc<GenericRenderObject>> {
        self.shaders
            .iter()
            .find(|shader| shader.as_shader().map(|s| s.stage()) == Some(stage))
    }
}
