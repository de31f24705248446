//! Configuration File Loading
//!
//! Finds the configuration file, parses it according to its extension and
//! validates the result before anything is deployed.

use super::Config;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "STUP_CONFIG";

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format (also the legacy `stup_config.json`)
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension; anything unknown is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    /// Candidate files, tried in order
    search_paths: Vec<PathBuf>,
    /// File the configuration was loaded from
    current_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader with the default search order
    pub fn new() -> Self {
        Self::with_search_paths(Self::default_search_paths())
    }

    /// Create a loader that only considers `search_paths`
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            current_path: None,
        }
    }

    /// Load and validate the configuration.
    ///
    /// An explicit path wins and must exist; otherwise the first existing
    /// search path is used.
    pub fn load(&mut self, explicit: Option<&Path>) -> Result<Config> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::ConfigLoadFailed {
                        path: path.to_path_buf(),
                        reason: "file does not exist".to_string(),
                    });
                }
                path.to_path_buf()
            }
            None => self
                .search_paths
                .iter()
                .find(|candidate| candidate.is_file())
                .cloned()
                .ok_or(Error::ConfigNotFound)?,
        };

        debug!("Loading configuration from {}", path.display());
        let config = Self::load_file(&path)?;
        self.current_path = Some(path);
        Ok(config)
    }

    /// Parse and validate one configuration file
    pub fn load_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let format = ConfigFormat::from_path(path);
        let config = Self::parse(&content, format)?;
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration text in the given format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Config> {
        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| Error::ConfigParseFailed {
            format: format.name().to_string(),
            reason,
        })
    }

    /// Default search order: `$STUP_CONFIG`, the working directory, the user
    /// config directory, then dotfiles in the home directory
    pub fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(explicit) = env::var_os(CONFIG_ENV_VAR) {
            paths.push(PathBuf::from(explicit));
        }

        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join("stup.toml"));
            paths.push(cwd.join("stup.json"));
            paths.push(cwd.join("stup_config.json"));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("stup").join("config.toml"));
            paths.push(config_dir.join("stup").join("config.json"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".stup.toml"));
            paths.push(home.join(".stup.json"));
        }

        paths
    }

    /// Validate configuration
    pub fn validate_config(config: &Config) -> Result<()> {
        let invalid = |field: String, reason: &str| Error::ConfigValidationFailed {
            field,
            reason: reason.to_string(),
        };

        if config.shell.program.trim().is_empty() {
            return Err(invalid("shell.program".into(), "Shell program cannot be empty"));
        }

        if config.shell.response_timeout_secs == 0 {
            return Err(invalid(
                "shell.response_timeout_secs".into(),
                "Response timeout must be greater than 0",
            ));
        }

        if config.deploy.hint_prefix.trim().is_empty() {
            return Err(invalid("deploy.hint_prefix".into(), "Hint prefix cannot be empty"));
        }

        if config.projects.is_empty() {
            return Err(invalid("projects".into(), "At least one project is required"));
        }

        for (project_id, project) in &config.projects {
            if project.path.as_os_str().is_empty() {
                return Err(invalid(
                    format!("projects.{}.path", project_id),
                    "Project path cannot be empty",
                ));
            }

            if project.targets.is_empty() {
                return Err(invalid(
                    format!("projects.{}.targets", project_id),
                    "A project needs at least one target",
                ));
            }

            for (target_id, target) in &project.targets {
                let prefix = format!("projects.{}.targets.{}", project_id, target_id);
                let required = [
                    ("tag", &target.tag),
                    ("ssh.url", &target.ssh.url),
                    ("ssh.user", &target.ssh.user),
                    ("ssh.key", &target.ssh.key),
                ];
                for (field, value) in required {
                    if value.trim().is_empty() {
                        return Err(invalid(
                            format!("{}.{}", prefix, field),
                            "Value cannot be empty",
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Get the current configuration file path
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// List all search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
