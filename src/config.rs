//! Viewer configuration.
//!
//! Read from the JSON file named by `PART_INSPECTOR_CONFIG`, else from
//! `part-inspector.json` in the working directory when it exists. Every field
//! has a default, so partial files are fine. The first command-line argument,
//! when present, replaces `model_path`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "PART_INSPECTOR_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "part-inspector.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub model_path: Option<PathBuf>,
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub highlight: HighlightConfig,
    /// Linear RGB clear colour.
    pub background: [f32; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            highlight: HighlightConfig::default(),
            background: [0.1, 0.1, 0.2],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Part Inspector".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of pending orbit motion applied per frame; 0 disables damping.
    pub damping: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            near: 0.01,
            far: 10_000.0,
            damping: 0.08,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Linear RGBA; alpha is the overlay opacity.
    pub color: [f32; 4],
    pub emissive: [f32; 3],
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 0.835, 0.31, 0.5],
            emissive: [0.333, 0.2, 0.0],
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json, &path.display().to_string())
    }

    /// Config file (if any) plus the command-line model path override.
    pub fn resolve<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = match config_file_path() {
            Some(path) => {
                log::info!("Reading config {}", path.display());
                Self::load_from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_args(args);
        Ok(config)
    }

    /// `args` excludes the program name.
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator<Item = String>,
    {
        if let Some(path) = args.into_iter().next() {
            self.model_path = Some(PathBuf::from(path));
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.exists().then_some(default)
}
