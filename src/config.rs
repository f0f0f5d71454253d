//! Static showroom description, supplied once at setup.
//!
//! Entities are declared by name; waypoints, products and UI elements refer to
//! them by name and are resolved against the scene when the controllers are built.

use std::collections::HashSet;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEMO_CONFIG: &str = include_str!("../assets/showroom.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowroomConfig {
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    /// Name of the camera entity
    pub camera: String,
    /// Waypoint entity names, in travel order
    pub waypoints: Vec<String>,
    pub entities: Vec<EntityConfig>,
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub move_speed: f32,
    pub rotation_speed: f32,
    pub smooth_factor: f32,
    pub locked: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 0.5,
            rotation_speed: 0.5,
            smooth_factor: 1.0,
            locked: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Distance below which the camera counts as near a product
    pub proximity_threshold: f32,
    /// Auto-rotation speed in degrees per second
    pub auto_rotate_speed: f32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 5.0,
            auto_rotate_speed: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub euler: Vec3,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Carries a clickable element component
    #[serde(default)]
    pub clickable: bool,
    /// Text shown by the overlay for UI entities
    #[serde(default)]
    pub label: Option<String>,
    /// Drawn as a cube by the renderer
    #[serde(default)]
    pub model: Option<ModelConfig>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub color: [f32; 3],
    #[serde(default = "default_model_size")]
    pub size: f32,
}

fn default_model_size() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    pub model: Option<String>,
    pub focus: Option<String>,
    pub panel: Option<String>,
    pub affordance: Option<String>,
    pub ui: Option<ProductUiConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductUiConfig {
    /// Drag-to-rotate sensitivity
    pub rotation_speed: f32,
    pub feature_screen: Option<String>,
    pub display_area: Option<String>,
    pub back_button: Option<String>,
    pub feature_close_button: Option<String>,
    pub color_buttons: Vec<String>,
    pub features: Vec<FeatureConfig>,
}

impl Default for ProductUiConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 2.0,
            feature_screen: None,
            display_area: None,
            back_button: None,
            feature_close_button: None,
            color_buttons: Vec::new(),
            features: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub button: Option<String>,
    pub is_video: bool,
    pub video: Option<String>,
    pub image: Option<String>,
}

impl ShowroomConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ShowroomConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The bundled three-product demo
    pub fn demo() -> Result<Self, ConfigError> {
        Self::from_json(DEMO_CONFIG)
    }

    /// Check value ranges and that the camera and at least one waypoint exist.
    /// Unresolvable product references are not errors; they are skipped with a
    /// warning when the controllers are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        range("motion.move_speed", self.motion.move_speed, 0.1, 2.0)?;
        range("motion.rotation_speed", self.motion.rotation_speed, 0.1, 2.0)?;
        range("motion.smooth_factor", self.motion.smooth_factor, 0.1, 2.0)?;
        range("rotation.proximity_threshold", self.rotation.proximity_threshold, 0.0, 1000.0)?;
        range("rotation.auto_rotate_speed", self.rotation.auto_rotate_speed, 0.0, 720.0)?;
        for product in &self.products {
            if let Some(ui) = &product.ui {
                range("ui.rotation_speed", ui.rotation_speed, 0.01, 20.0)?;
            }
        }

        let mut names = HashSet::new();
        for entity in &self.entities {
            if !names.insert(entity.name.as_str()) {
                return Err(ConfigError::DuplicateEntity(entity.name.clone()));
            }
        }
        if !names.contains(self.camera.as_str()) {
            return Err(ConfigError::MissingCamera(self.camera.clone()));
        }
        if !self.waypoints.iter().any(|w| names.contains(w.as_str())) {
            return Err(ConfigError::NoWaypoints);
        }
        Ok(())
    }
}

fn range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}
