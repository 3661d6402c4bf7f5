//! User preferences persisted as JSON.
//!
//! Debug builds keep `config.json` in the working directory; installed
//! builds use the platform config dir (`~/.config/position-annotator/` on
//! Linux).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::ConfigError;
use crate::geometry::Shape;
use crate::source::RasterFormat;
use crate::transform::CoordinateOrigin;

const APP_DIR: &str = "position-annotator";
const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Modifier that turns a primary-button drag into a pan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanModifier {
    #[default]
    Shift,
    Alt,
    Ctrl,
}

impl PanModifier {
    pub fn is_held(&self, modifiers: &egui::Modifiers) -> bool {
        match self {
            PanModifier::Shift => modifiers.shift,
            PanModifier::Alt => modifiers.alt,
            PanModifier::Ctrl => modifiers.command,
        }
    }
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfigData {
    /// Shape preselected in the toolbar on startup
    #[serde(default)]
    pub default_shape: Shape,

    /// Origin preselected for exports
    #[serde(default)]
    pub default_origin: CoordinateOrigin,

    /// Format last chosen for PDF rasterization
    #[serde(default)]
    pub pdf_format: RasterFormat,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    #[serde(default)]
    pub pan_modifier: PanModifier,

    /// Directory of the last opened file, used to seed file dialogs
    #[serde(default)]
    pub last_directory: Option<PathBuf>,
}

impl Default for AppConfigData {
    fn default() -> Self {
        Self {
            default_shape: Shape::default(),
            default_origin: CoordinateOrigin::default(),
            pdf_format: RasterFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            pan_modifier: PanModifier::default(),
            last_directory: None,
        }
    }
}

pub struct AppConfig {
    pub data: AppConfigData,
    pub config_path: PathBuf,
    pub dirty: bool,
}

/// Result of loading config from disk
pub struct LoadConfigResult {
    pub config: AppConfig,
    /// Set when the file existed but had to be replaced by defaults
    pub reset_reason: Option<String>,
}

pub fn config_path() -> PathBuf {
    if cfg!(debug_assertions) {
        return PathBuf::from(CONFIG_FILE);
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

fn read_config(path: &Path) -> Result<AppConfigData, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
    serde_json::from_str(&json).map_err(ConfigError::Parse)
}

pub fn load_config(config_path: PathBuf) -> LoadConfigResult {
    let (data, reset_reason) = if config_path.exists() {
        match read_config(&config_path) {
            Ok(data) => {
                info!("Loaded config from {:?}", config_path);
                (data, None)
            }
            Err(e) => {
                warn!("{}", e);
                (AppConfigData::default(), Some(e.to_string()))
            }
        }
    } else {
        info!("No config file found, using defaults");
        (AppConfigData::default(), None)
    };

    LoadConfigResult {
        config: AppConfig {
            data,
            config_path,
            dirty: false,
        },
        reset_reason,
    }
}

fn write_config(config: &AppConfig) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(&config.data).map_err(ConfigError::Serialize)?;
    if let Some(parent) = config.config_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    std::fs::write(&config.config_path, json).map_err(|source| ConfigError::Write {
        path: config.config_path.clone(),
        source,
    })
}

impl AppConfig {
    /// Writes the file if something changed since the last save.
    pub fn save_if_dirty(&mut self) {
        if !self.dirty {
            return;
        }
        match write_config(self) {
            Ok(()) => info!("Config saved to {:?}", self.config_path),
            Err(e) => error!("{}", e),
        }
        self.dirty = false;
    }

    pub fn remember_directory(&mut self, file: &Path) {
        let dir = file.parent().map(Path::to_path_buf);
        if dir.is_some() && dir != self.data.last_directory {
            self.data.last_directory = dir;
            self.dirty = true;
        }
    }
}
