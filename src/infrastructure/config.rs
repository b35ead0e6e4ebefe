use crate::domain::config::EchoConfig;
use crate::domain::error::{EchoError, EchoResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration manager. An explicit path must exist and parse; the
/// default location is optional and falls back to built-in defaults.
pub struct ConfigManager {
    default_path: Option<PathBuf>,
}

impl ConfigManager {
    pub fn new() -> Self {
        let default_path = dirs::config_dir().map(|dir| dir.join("netecho").join("config.toml"));
        Self { default_path }
    }

    /// Load from the default location if a file exists there,
    /// otherwise return the built-in defaults.
    pub fn load(&self) -> EchoResult<EchoConfig> {
        match &self.default_path {
            Some(path) if path.exists() => self.load_from_path(path),
            _ => Ok(EchoConfig::default()),
        }
    }

    /// Load from an explicit path. Missing or malformed files are
    /// errors here, unlike the default location.
    pub fn load_from_path(&self, path: &Path) -> EchoResult<EchoConfig> {
        let content = fs::read_to_string(path).map_err(|e| EchoError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| EchoError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_path_loads_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tcp]\nbuffer_size = 256\n\n[udp]\nreply_timeout_ms = 10").unwrap();

        let manager = ConfigManager::new();
        let config = manager.load_from_path(file.path()).unwrap();
        assert_eq!(config.tcp.buffer_size, 256);
        assert_eq!(config.udp.reply_timeout_ms, 10);
        assert_eq!(config.udp.buffer_size, 4096);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let manager = ConfigManager::new();
        let result = manager.load_from_path(Path::new("/nonexistent/netecho.toml"));
        assert!(matches!(result, Err(EchoError::Config { .. })));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tcp\nbuffer_size = ").unwrap();

        let manager = ConfigManager::new();
        let result = manager.load_from_path(file.path());
        assert!(matches!(result, Err(EchoError::Config { .. })));
    }
}
