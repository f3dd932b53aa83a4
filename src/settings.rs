use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::theme::ThemeId;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "docview";

/// Extensions that switch the text viewer to code-friendly defaults.
const DEFAULT_CODE_EXTENSIONS: &[&str] = &[
    "rs", "c", "h", "cpp", "hpp", "cc", "cs", "go", "java", "kt", "js", "jsx", "ts", "tsx", "py",
    "rb", "php", "swift", "sh", "bash", "zsh", "ps1", "sql", "html", "htm", "css", "scss", "xml",
    "json", "yaml", "yml", "toml", "ini", "cfg", "conf", "md", "log", "csv",
];

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSettings {
    /// Extensions (without dot, lowercase) treated as source/markup/config files
    #[serde(default = "default_code_extensions")]
    pub code_extensions: Vec<String>,

    #[serde(default = "default_true")]
    pub word_wrap: bool,
}

impl TextSettings {
    pub fn is_code_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.code_extensions.iter().any(|known| *known == ext)
    }
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            code_extensions: default_code_extensions(),
            word_wrap: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub theme: ThemeId,

    /// Increment used by the zoom-in/zoom-out commands
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,

    /// Auto-advance period at scroll speed 1.0, in milliseconds
    #[serde(default = "default_auto_advance_ms")]
    pub auto_advance_base_ms: u64,

    /// Raster scale applied on top of the user zoom for PDF pages
    #[serde(default = "default_pdf_render_scale")]
    pub pdf_render_scale: f32,

    #[serde(default = "default_pdf_cache_size")]
    pub pdf_cache_size: usize,

    #[serde(default)]
    pub text: TextSettings,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_zoom_step() -> f32 {
    0.25
}

fn default_auto_advance_ms() -> u64 {
    3000
}

fn default_pdf_render_scale() -> f32 {
    1.5
}

fn default_pdf_cache_size() -> usize {
    16
}

fn default_code_extensions() -> Vec<String> {
    DEFAULT_CODE_EXTENSIONS
        .iter()
        .map(|ext| (*ext).to_string())
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            theme: ThemeId::default(),
            zoom_step: default_zoom_step(),
            auto_advance_base_ms: default_auto_advance_ms(),
            pdf_render_scale: default_pdf_render_scale(),
            pdf_cache_size: default_pdf_cache_size(),
            text: TextSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml_str(content: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = serde_yaml::from_str(content)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml_str(&content)?;
        debug!("Loaded settings from {path:?}");
        Ok(settings)
    }

    /// Load the user config if one exists, falling back to defaults.
    ///
    /// Settings are only ever read; the viewer keeps no state between sessions.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            warn!("Could not determine config directory, using default settings");
            return Self::default();
        };
        if !path.exists() {
            info!("No settings file at {path:?}, using defaults");
            return Self::default();
        }
        match Self::load_from_path(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring settings file: {e}");
                Self::default()
            }
        }
    }

    pub fn is_code_extension(&self, ext: &str) -> bool {
        self.text.is_code_extension(ext)
    }

    fn sanitize(&mut self) {
        if !self.zoom_step.is_finite() || self.zoom_step <= 0.0 {
            warn!("Invalid zoom_step {}, using default", self.zoom_step);
            self.zoom_step = default_zoom_step();
        }
        if self.auto_advance_base_ms == 0 {
            self.auto_advance_base_ms = default_auto_advance_ms();
        }
        if !self.pdf_render_scale.is_finite() || self.pdf_render_scale <= 0.0 {
            self.pdf_render_scale = default_pdf_render_scale();
        }
        self.pdf_cache_size = self.pdf_cache_size.max(1);
        for ext in &mut self.text.code_extensions {
            *ext = ext.trim_start_matches('.').to_ascii_lowercase();
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}
