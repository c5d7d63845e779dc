//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ACCREDIFY_ROOT_FOLDER`, then `ACCREDIFY_ROOT` environment variable
//! 3. `root_folder` in the module's TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never stops startup; it is logged and
//! compiled defaults are used instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary root folder environment variable
pub const ROOT_FOLDER_ENV: &str = "ACCREDIFY_ROOT_FOLDER";

/// Alternative root folder environment variable
pub const ROOT_ENV: &str = "ACCREDIFY_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "accredify.db";

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub bind_address: String,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 5740,
        }
    }
}

/// Logging section of the TOML config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. "info" or "accredify_tracker=debug"
    pub level: Option<String>,
}

/// Text-enrichment collaborator section of the TOML config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrichmentConfig {
    /// HTTP endpoint of the enrichment service; offline enrichment when absent
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Module TOML configuration file contents
///
/// Every field is optional so partial files stay valid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load the config for `module_name`, falling back to defaults
    pub fn load_or_default(module_name: &str) -> Self {
        let Some(path) = config_file_path(module_name) else {
            debug!(module = module_name, "No config file found, using defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config file");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }
}

/// Locate `<module_name>.toml`: user config dir first, then `/etc/accredify`
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    let file_name = format!("{}.toml", module_name);

    let user_config = dirs::config_dir().map(|d| d.join("accredify").join(&file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/accredify").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolves the root folder holding the database
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_config: Option<TomlConfig>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_config: None,
        }
    }

    /// Highest-priority override from the command line
    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    /// Use an already-loaded TOML config instead of reading the module file
    pub fn with_toml_config(mut self, config: TomlConfig) -> Self {
        self.toml_config = Some(config);
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_ENV] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    return PathBuf::from(path);
                }
            }
        }

        let from_toml = match &self.toml_config {
            Some(config) => config.root_folder.clone(),
            None => TomlConfig::load_or_default(&self.module_name).root_folder,
        };
        if let Some(path) = from_toml {
            return path;
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and names the files inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if missing (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder).map_err(|e| {
            Error::Config(format!(
                "Failed to create root folder {}: {}",
                self.root_folder.display(),
                e
            ))
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("accredify"))
        .unwrap_or_else(|| PathBuf::from("./accredify_data"))
}
