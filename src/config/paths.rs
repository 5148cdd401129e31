//! Where the amplifier keeps its two files, resolved with `dirs`.
//!
//! Config dir (settings + saved profiles):
//!   Windows: %APPDATA%\sound-amplifier\
//!   macOS:   ~/Library/Application Support/sound-amplifier/
//!   Linux:   ~/.config/sound-amplifier/

use std::path::PathBuf;

/// Locations of `settings.toml` and `profiles.json`.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `profiles.json`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `profiles.json` (user-saved profiles).
    pub profiles_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "sound-amplifier";

    /// The platform config directory, or `./sound-amplifier` when the
    /// platform has none.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);
        Self::in_dir(config_dir)
    }

    /// Lay the files out under an explicit directory.
    pub fn in_dir(config_dir: PathBuf) -> Self {
        Self {
            settings_file: config_dir.join("settings.toml"),
            profiles_file: config_dir.join("profiles.json"),
            config_dir,
        }
    }
}
