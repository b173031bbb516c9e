/// Renderer and pipeline configuration

use glam::UVec2;

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name (used in logs)
    pub app_name: String,
    /// Enable backend validation/debug output
    pub enable_validation: bool,
    /// Initial window size in physical pixels
    pub window_size: UVec2,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "XR Application".to_string(),
            enable_validation: cfg!(debug_assertions),
            window_size: UVec2::new(1280, 720),
        }
    }
}

/// Render pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pipeline name (used in logs)
    pub name: String,
    /// Internal (render) resolution relative to the full (display) resolution
    pub resolution_scale: f32,
    /// Edge length of the precomputed BRDF lookup texture
    pub brdf_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            resolution_scale: 1.0,
            brdf_size: 512,
        }
    }
}

impl PipelineConfig {
    /// Internal resolution for a given full resolution
    ///
    /// Each axis is scaled and rounded, never below one pixel.
    pub fn internal_size(&self, full: UVec2) -> UVec2 {
        let scale = if self.resolution_scale.is_finite() && self.resolution_scale > 0.0 {
            self.resolution_scale
        } else {
            1.0
        };
        UVec2::new(
            ((full.x as f32 * scale).round() as u32).max(1),
            ((full.y as f32 * scale).round() as u32).max(1),
        )
    }
}
