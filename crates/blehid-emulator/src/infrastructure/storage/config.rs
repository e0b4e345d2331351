//! TOML-based configuration for the emulator.
//!
//! Reads `EmulatorConfig` from the platform-appropriate config file unless a
//! path is given explicitly:
//! - Windows:  `%APPDATA%\BleHidEmulator\config.toml`
//! - Linux:    `~/.config/blehid-emulator/config.toml`
//! - macOS:    `~/Library/Application Support/BleHidEmulator/config.toml`
//!
//! Example file:
//!
//! ```toml
//! [emulator]
//! device_name = "BLE HID Emulator"
//! log_level = "info"
//!
//! [control]
//! bind_address = "127.0.0.1"
//! port = 24900
//! max_frame_len = 4096
//!
//! [devices]
//! keyboard = true
//! mouse = true
//! pointer_profile = "basic"
//! click_gap_ms = 40
//!
//! [transport]
//! simulated_subscriber = true
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "some_fn")]` and every section
//! carries `#[serde(default)]`, so a partial file (or no file at all) still
//! yields a complete configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use blehid_core::protocol::DEFAULT_MAX_FRAME_LEN;
use blehid_core::PointerProfile;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The device name is echoed inside an ASCII command frame.
    #[error("device name {0:?} must be ASCII")]
    NonAsciiDeviceName(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level emulator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmulatorConfig {
    #[serde(default)]
    pub emulator: GeneralConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub devices: DevicesConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Identity and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Name reported by `AT+BLECURRENTDEVICENAME` and used when advertising.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// The local command channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlConfig {
    /// Address the command server binds to.  Loopback by default; the
    /// channel has no authentication.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port of the command server.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted inbound frame body in bytes.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

/// Which virtual devices to expose and how they behave.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DevicesConfig {
    #[serde(default = "default_true")]
    pub keyboard: bool,
    #[serde(default = "default_true")]
    pub mouse: bool,
    /// `"basic"` for 3-byte pointer reports, `"wheel"` for 4-byte reports.
    #[serde(default)]
    pub pointer_profile: PointerProfile,
    /// Gap between the press and release reports of a click.
    #[serde(default = "default_click_gap_ms")]
    pub click_gap_ms: u64,
}

/// Settings for the built-in simulated GATT transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportConfig {
    /// Pretend one central subscribes as soon as advertising starts.
    #[serde(default = "default_true")]
    pub simulated_subscriber: bool,
}

impl EmulatorConfig {
    /// Checks values that serde alone cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonAsciiDeviceName`] if the device name could
    /// not be sent back in a response frame.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.emulator.device_name;
        if !name.is_ascii() {
            return Err(ConfigError::NonAsciiDeviceName(name.clone()));
        }
        Ok(())
    }
}

impl DevicesConfig {
    /// The click gap as a [`Duration`].
    pub fn click_gap(&self) -> Duration {
        Duration::from_millis(self.click_gap_ms)
    }
}

impl ControlConfig {
    /// `bind_address:port` as a string suitable for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_device_name() -> String {
    "BLE HID Emulator".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    24900
}
fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}
fn default_true() -> bool {
    true
}
fn default_click_gap_ms() -> u64 {
    40
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            keyboard: default_true(),
            mouse: default_true(),
            pointer_profile: PointerProfile::default(),
            click_gap_ms: default_click_gap_ms(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            simulated_subscriber: default_true(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads `EmulatorConfig` from `path`, returning defaults if the file does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and the
/// [`EmulatorConfig::validate`] errors.
pub fn load_config_from(path: &Path) -> Result<EmulatorConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let config: EmulatorConfig = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EmulatorConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &EmulatorConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("BleHidEmulator"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("blehid-emulator"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("BleHidEmulator")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
