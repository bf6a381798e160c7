//! Renderer configuration

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::assets::AssetManifest;
use crate::foundation::math::Vec3;

/// Top-level renderer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Window creation settings
    pub window: WindowSettings,
    /// Enable the Khronos validation layer (debug builds only)
    pub enable_validation: bool,
    /// Fixed camera pose and projection parameters
    pub camera: CameraSettings,
    /// Color the color attachment is cleared to each frame
    pub clear_color: [f32; 4],
    /// Logical asset name to file path mapping
    pub assets: AssetManifest,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            enable_validation: cfg!(debug_assertions),
            camera: CameraSettings::default(),
            clear_color: [0.1, 0.1, 0.1, 1.0],
            assets: AssetManifest::default(),
        }
    }
}

impl Config for RendererConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate()
    }
}

/// Window creation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Title bar text, also used as the Vulkan application name
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Billboards".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Fixed camera: a translation plus perspective parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Near clip plane distance
    pub near: f32,
    /// Far clip plane distance
    pub far: f32,
    /// World-to-camera translation
    pub translation: Vec3,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 100.0,
            translation: Vec3::new(0.0, -0.3, -1.0),
        }
    }
}

impl CameraSettings {
    /// Check the projection parameters describe a usable frustum
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(format!("camera: {reason}")))
        };

        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            return invalid(format!("fov_y_degrees must be in (0, 180), got {}", self.fov_y_degrees));
        }
        if !(self.near.is_finite() && self.near > 0.0) {
            return invalid(format!("near must be positive, got {}", self.near));
        }
        if !(self.far.is_finite() && self.far > self.near) {
            return invalid(format!("far must exceed near ({}), got {}", self.near, self.far));
        }
        if !self.translation.iter().all(|c| c.is_finite()) {
            return invalid("translation must be finite".to_string());
        }
        Ok(())
    }
}
