use std::path::{Path, PathBuf};

use optional_struct::*;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::{
    ignore_file::IGNORE_FILE_NAME,
    releases::{Channel, DEFAULT_REPO},
    StyluaxError,
};

pub const HOME_CONFIG_FILE: &str = "styluax.ron";
pub const PROJECT_CONFIG_FILE: &str = ".styluax.ron";

/// Returns the path to the configuration directory.
pub fn home_config_dir() -> PathBuf {
    dirs::home_dir()
        .expect("Failed to get home directory")
        .join(".config")
        .join("styluax")
}

#[optional_struct(ConfigFile)]
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Path to a user-managed stylua binary. When set, installation and
    /// update checks are skipped.
    pub stylua_path: String,

    /// Release tag to track, or "latest".
    pub version: String,

    /// Check for a newer release on startup.
    pub check_update: bool,

    /// Explicit stylua.toml path handed to the binary. When empty the
    /// binary searches parent directories itself.
    pub config_path: String,

    /// GitHub repository releases are fetched from.
    pub repo: String,
}

impl Config {
    /// The configured custom binary path, if any.
    pub fn custom_path(&self) -> Option<PathBuf> {
        if self.stylua_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.stylua_path))
        }
    }

    /// The configured formatter config file, cleaned, if any.
    pub fn formatter_config_path(&self) -> Option<PathBuf> {
        if self.config_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.config_path).clean())
        }
    }

    /// The release channel for the configured version.
    pub fn channel(&self) -> Channel {
        Channel::from_version(&self.version)
    }

    /// Sets the custom binary path.
    pub fn with_stylua_path<S: Into<String>>(mut self, path: S) -> Self {
        self.stylua_path = path.into();
        self
    }

    /// Sets the release tag to track.
    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self
    }

    /// Sets whether to check for a newer release on startup.
    pub fn with_check_update(mut self, check_update: bool) -> Self {
        self.check_update = check_update;
        self
    }

    /// Sets the explicit formatter config file path.
    pub fn with_config_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config_path = path.into();
        self
    }
}

/// The built-in defaults that configuration files layer over.
pub fn default_config() -> Config {
    Config {
        stylua_path: String::new(),
        version: "latest".to_string(),
        check_update: true,
        config_path: String::new(),
        repo: DEFAULT_REPO.to_string(),
    }
}

/// Deserialize a RON string into a ConfigFile.
pub fn parse_config_file(ron_str: &str) -> crate::Result<ConfigFile> {
    let options =
        ron::Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME);
    options
        .from_str(ron_str)
        .map_err(|e| StyluaxError::Config(format!("Failed to parse RON: {}", e)))
}

/// Loads the configuration by merging defaults, home, and workspace
/// configuration files. Returns the complete Config object.
pub fn parse_config(home_config: &str, project_config: &str) -> crate::Result<Config> {
    let default_conf = default_config();
    let mut cnf = ConfigFile::default();

    if !home_config.is_empty() {
        let home_config = parse_config_file(home_config)
            .map_err(|e| StyluaxError::Config(format!("Failed to parse home config file: {}", e)))?;
        cnf = cnf.apply(home_config);
    }

    if !project_config.is_empty() {
        let project_config = parse_config_file(project_config).map_err(|e| {
            StyluaxError::Config(format!("Failed to parse workspace config file: {}", e))
        })?;
        cnf = cnf.apply(project_config);
    }
    Ok(cnf.build(default_conf))
}

/// Reads and merges the on-disk configuration for a workspace. The
/// configuration is re-read per call rather than cached, so the on-disk
/// state is authoritative as of each request.
pub fn load_config(workspace_root: Option<&Path>) -> crate::Result<Config> {
    let home_path = home_config_dir().join(HOME_CONFIG_FILE);
    let home_config = if home_path.exists() {
        fs_err::read_to_string(&home_path)?
    } else {
        String::new()
    };

    let project_config = match workspace_root {
        Some(root) => {
            let path = root.join(PROJECT_CONFIG_FILE);
            if path.exists() {
                fs_err::read_to_string(&path)?
            } else {
                String::new()
            }
        }
        None => String::new(),
    };

    parse_config(&home_config, &project_config)
}

/// Finds the workspace root for a directory by walking up towards the
/// filesystem root looking for a `.git` directory, a workspace config file,
/// or a `.styluaignore`.
pub fn find_workspace_root(current_dir: &Path) -> Option<PathBuf> {
    let mut dir = current_dir.to_path_buf();
    loop {
        if dir.join(".git").is_dir()
            || dir.join(PROJECT_CONFIG_FILE).is_file()
            || dir.join(IGNORE_FILE_NAME).is_file()
        {
            return Some(dir.clean());
        }
        if !dir.pop() {
            return None;
        }
    }
}
