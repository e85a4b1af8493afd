use crate::error::{CliError, Result};
use directories::ProjectDirs;
use esmfold::engine::environment::PackageSpec;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable that overrides every other home setting.
pub const HOME_ENV_VAR: &str = "ESMFOLD_HOME";

const PATH_CONFIG_FILE: &str = "path.conf";

/// Locates the directory ESMFold is installed into.
///
/// Resolution order: `ESMFOLD_HOME`, then the path saved with `env set-path`,
/// then `<data dir>/esm-2.0.0`.
#[derive(Debug)]
pub struct PackageHome {
    path: PathBuf,
}

impl PackageHome {
    pub fn new() -> Result<Self> {
        let env_value = std::env::var(HOME_ENV_VAR).ok();
        let path = Self::resolve(
            env_value.as_deref(),
            &Self::path_config_file()?,
            &Self::default_root()?,
        )?;
        debug!("Package home resolved to {:?}", &path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_custom_path(path: &Path) -> Result<()> {
        Self::write_path_config(&Self::path_config_file()?, path)
    }

    pub fn reset_path() -> Result<()> {
        Self::remove_path_config(&Self::path_config_file()?)
    }

    fn resolve(env_value: Option<&str>, config_file: &Path, default_root: &Path) -> Result<PathBuf> {
        if let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(value));
        }
        if config_file.exists() {
            let custom = fs::read_to_string(config_file)?.trim().to_string();
            if !custom.is_empty() {
                return Ok(PathBuf::from(custom));
            }
            warn!("Custom path config file is empty, falling back to default path.");
        }
        Ok(PackageSpec::ESM.home_in(default_root))
    }

    fn write_path_config(config_file: &Path, path: &Path) -> Result<()> {
        let absolute = std::path::absolute(path)?;
        let value = absolute.to_str().ok_or_else(|| {
            CliError::Home(format!("Path is not valid UTF-8: {}", absolute.display()))
        })?;
        if let Some(parent) = config_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(config_file, value).map_err(CliError::from)
    }

    fn remove_path_config(config_file: &Path) -> Result<()> {
        if config_file.exists() {
            fs::remove_file(config_file)?;
        }
        Ok(())
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("org", "esmfold", "esmfold-runner")
    }

    fn path_config_file() -> Result<PathBuf> {
        Self::project_dirs()
            .map(|dirs| dirs.config_dir().join(PATH_CONFIG_FILE))
            .ok_or_else(|| CliError::Home("Could not determine config directory path.".to_string()))
    }

    fn default_root() -> Result<PathBuf> {
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| {
                CliError::Home("Could not determine default data directory path.".to_string())
            })
    }
}
