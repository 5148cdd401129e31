//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every section is `#[serde(default)]`, so a file written by an older build
//! with missing keys still loads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::session::DEFAULT_HIGH_GAIN_THRESHOLD;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Device selection and capture queue depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name; `None` means the system default.
    pub input_device: Option<String>,
    /// Output device name; `None` means the system default.
    pub output_device: Option<String>,
    /// Capacity of the capture → output queue in milliseconds.
    pub buffer_ms: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            buffer_ms: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// VisualConfig
// ---------------------------------------------------------------------------

/// Spectrum display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// Analysis window in samples (power of two, 32 – 4096).
    pub fft_size: usize,
    /// Sampler ticks per second.
    pub frame_rate: u32,
    /// Time smoothing between frames (0.0 – 1.0).
    pub smoothing: f32,
    /// Level shown as an empty bar.
    pub min_db: f32,
    /// Level shown as a full bar.
    pub max_db: f32,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            frame_rate: 60,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

// ---------------------------------------------------------------------------
// SafetyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Output gain (percent) above which the hearing-safety warning fires.
    pub high_gain_threshold: f32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            high_gain_threshold: DEFAULT_HIGH_GAIN_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Theme / UiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// egui window appearance and behaviour settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: Theme,
    /// Keep the window floating above all other windows.
    pub always_on_top: bool,
    /// Initial window size `(width, height)` in logical pixels.
    pub window_size: (f32, f32),
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            always_on_top: false,
            window_size: (420.0, 720.0),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use sound_amplifier::config::{AppConfig, AppPaths, Theme};
///
/// let paths = AppPaths::new();
/// // Defaults when the file is missing or broken
/// let mut config = AppConfig::load_or_default(&paths.settings_file);
///
/// config.ui.theme = Theme::Light;
/// config.save_to(&paths.settings_file).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub visual: VisualConfig,
    pub safety: SafetyConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load from `path`.  A missing file gives the defaults (first run).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load, logging and falling back to defaults on any error.
    pub fn load_or_default(path: &std::path::Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            log::warn!("[config] cannot read {}: {e:#}; using defaults", path.display());
            Self::default()
        })
    }

    /// Write to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
