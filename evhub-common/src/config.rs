//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Default listen address for the Event Submission service
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5641";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_file_key: Option<&str>,
) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Some(key) = config_file_key {
        if let Some(value) = read_config_string(key) {
            return Ok(PathBuf::from(value));
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(get_default_root_folder())
}

/// Listen address resolution following the same priority order as the root folder:
/// environment variable, then TOML config file, then the compiled default.
pub fn resolve_listen_addr(env_var_name: &str, config_file_key: Option<&str>) -> String {
    if let Ok(addr) = std::env::var(env_var_name) {
        return addr;
    }

    if let Some(key) = config_file_key {
        if let Some(value) = read_config_string(key) {
            return value;
        }
    }

    DEFAULT_LISTEN_ADDR.to_string()
}

/// Read a single string value from the TOML config file, if present
fn read_config_string(key: &str) -> Option<String> {
    let config_path = load_config_file().ok()?;
    let toml_content = std::fs::read_to_string(&config_path).ok()?;
    let config = toml::from_str::<toml::Value>(&toml_content).ok()?;
    config
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Get default configuration file path for the platform
fn load_config_file() -> Result<PathBuf> {
    let config_path = if cfg!(target_os = "linux") {
        // Try ~/.config/evhub/config.toml first, then /etc/evhub/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("evhub").join("config.toml"));
        let system_config = PathBuf::from("/etc/evhub/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else if cfg!(target_os = "macos") || cfg!(target_os = "windows") {
        dirs::config_dir()
            .map(|d| d.join("evhub").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    } else {
        return Err(Error::Config("Unsupported platform".to_string()));
    };

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!(
            "Config file not found: {:?}",
            config_path
        )))
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/evhub (or /var/lib/evhub for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("evhub"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/evhub"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/evhub
        dirs::data_dir()
            .map(|d| d.join("evhub"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/evhub"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\evhub
        dirs::data_local_dir()
            .map(|d| d.join("evhub"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\evhub"))
    } else {
        PathBuf::from("./evhub_data")
    }
}
