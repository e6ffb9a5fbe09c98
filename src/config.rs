//! Configuration for the episode windower.

use crate::core::{GoalSpec, WindowConfig, WindowError, DEFAULT_WINDOW_LENGTH};
use crate::source::{load_goal_image, SourceError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of consecutive timesteps per sample
    pub window_length: usize,

    /// How the task goal is chosen
    pub goal: GoalConfig,

    /// Directory exports are written under
    pub export_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("episode-windower");

        Self {
            window_length: DEFAULT_WINDOW_LENGTH,
            goal: GoalConfig::default(),
            export_path: data_dir.join("exports"),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("episode-windower")
            .join("config.json")
    }

    /// Ensure the export directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Turn the loose configuration into a checked [`WindowConfig`].
    ///
    /// Goal images named in the config are read from disk here.
    pub fn window_config(&self) -> Result<WindowConfig, ConfigError> {
        let goal_spec = self.goal.to_goal_spec()?;
        Ok(WindowConfig::new(self.window_length, goal_spec)?)
    }
}

/// Goal selection in keyword form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalConfig {
    /// `image` or `language`
    pub goal_type: String,
    /// Instruction for language goals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    /// Explicit primary goal image (.npy, H x W x C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_image_primary: Option<PathBuf>,
    /// Explicit wrist goal image (.npy, H x W x C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_image_wrist: Option<PathBuf>,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            goal_type: "image".to_string(),
            instruction: None,
            goal_image_primary: None,
            goal_image_wrist: None,
        }
    }
}

impl GoalConfig {
    /// Resolve the keyword form into a [`GoalSpec`].
    ///
    /// Goal images are only read for image goals; paths left over from an
    /// earlier image configuration do not affect a language goal.
    pub fn to_goal_spec(&self) -> Result<GoalSpec, ConfigError> {
        let (primary, wrist) = if GoalSpec::is_image_tag(&self.goal_type) {
            (
                self.goal_image_primary
                    .as_deref()
                    .map(load_goal_image)
                    .transpose()?,
                self.goal_image_wrist
                    .as_deref()
                    .map(load_goal_image)
                    .transpose()?,
            )
        } else {
            (None, None)
        };

        Ok(GoalSpec::parse(
            &self.goal_type,
            self.instruction.clone(),
            primary,
            wrist,
        )?)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Source(SourceError),
    Window(WindowError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Source(e) => write!(f, "Goal image error: {e}"),
            ConfigError::Window(e) => write!(f, "Window config error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<SourceError> for ConfigError {
    fn from(e: SourceError) -> Self {
        ConfigError::Source(e)
    }
}

impl From<WindowError> for ConfigError {
    fn from(e: WindowError) -> Self {
        ConfigError::Window(e)
    }
}
