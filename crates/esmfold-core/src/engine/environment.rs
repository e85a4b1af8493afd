use crate::engine::config::EnvironmentConfig;
use crate::engine::error::EngineError;
use crate::engine::runner::shell_quote;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Sentinel target written once the ESM repository is cloned.
pub const ESM_CLONED: &str = "ESM_CLONED";
/// Sentinel target written once the conda environment is built.
pub const ESMFOLD_INSTALLED: &str = "ESMFOLD_INSTALLED";
/// Sentinel target written once the inference script is in place.
pub const SCRIPT_INSTALLED: &str = "SCRIPT_INSTALLED";

const EMBEDDED_MANIFEST: &str = include_str!("../../data/install.toml");

/// Name and version of the installed package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: &'static str,
    pub version: &'static str,
}

impl PackageSpec {
    pub const ESM: PackageSpec = PackageSpec {
        name: "esm",
        version: "2.0.0",
    };

    /// `<name>-<version>`, used both as conda environment and home directory name.
    pub fn env_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    pub fn home_in(&self, root: &Path) -> PathBuf {
        root.join(self.env_name())
    }
}

/// Pinned description of how the environment is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct InstallManifest {
    pub repository: String,
    pub clone_dir: String,
    pub environment_file: String,
    pub environment_name: String,
    #[serde(default)]
    pub conda_packages: Vec<String>,
    #[serde(default)]
    pub setup_commands: Vec<String>,
    #[serde(default)]
    pub pip_packages: Vec<String>,
}

impl InstallManifest {
    /// The manifest shipped with the crate.
    pub fn embedded() -> Result<Self, EngineError> {
        Self::from_toml_str(EMBEDDED_MANIFEST)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        let manifest: Self =
            toml::from_str(content).map_err(|e| EngineError::Manifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let content = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), EngineError> {
        let required = [
            ("repository", &self.repository),
            ("clone-dir", &self.clone_dir),
            ("environment-file", &self.environment_file),
            ("environment-name", &self.environment_name),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(EngineError::Manifest(format!("'{}' must not be empty", key)));
            }
        }
        Ok(())
    }
}

/// What an install step does when it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// A shell command line run from the package home.
    Shell(String),
    /// Write the bundled inference script to the configured script path.
    WriteScript,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStep {
    pub label: String,
    pub target: &'static str,
    pub action: StepAction,
}

impl InstallStep {
    /// The sentinel file marking this step as done.
    pub fn sentinel(&self, home: &Path) -> PathBuf {
        home.join(self.target)
    }

    /// Human-readable form of the step's action, as shown by a dry run.
    pub fn describe(&self, env: &EnvironmentConfig) -> String {
        match &self.action {
            StepAction::Shell(command) => command.clone(),
            StepAction::WriteScript => format!("write {}", env.script_path.display()),
        }
    }
}

/// Ordered steps that build the ESMFold environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    steps: Vec<InstallStep>,
}

impl InstallPlan {
    pub fn new(manifest: &InstallManifest, env: &EnvironmentConfig) -> Self {
        let clone = format!(
            "git clone {} {}",
            shell_quote(&manifest.repository),
            shell_quote(&manifest.clone_dir)
        );

        let mut parts = vec![
            format!("cd {}", shell_quote(&manifest.clone_dir)),
            format!(
                "conda env create -f {}",
                shell_quote(&manifest.environment_file)
            ),
            format!(
                "conda rename -n {} {}",
                shell_quote(&manifest.environment_name),
                shell_quote(&env.env_name)
            ),
            env.activation_command(),
        ];
        if !manifest.conda_packages.is_empty() {
            let packages: Vec<String> =
                manifest.conda_packages.iter().map(|p| shell_quote(p)).collect();
            parts.push(format!("conda install -y {}", packages.join(" ")));
        }
        parts.extend(manifest.setup_commands.iter().cloned());
        parts.extend(
            manifest
                .pip_packages
                .iter()
                .map(|p| format!("pip install {}", shell_quote(p))),
        );

        Self {
            steps: vec![
                InstallStep {
                    label: "Clone the ESM repository".to_string(),
                    target: ESM_CLONED,
                    action: StepAction::Shell(clone),
                },
                InstallStep {
                    label: "Create the ESMFold conda environment".to_string(),
                    target: ESMFOLD_INSTALLED,
                    action: StepAction::Shell(parts.join(" && ")),
                },
                InstallStep {
                    label: "Install the inference script".to_string(),
                    target: SCRIPT_INSTALLED,
                    action: StepAction::WriteScript,
                },
            ],
        }
    }

    pub fn steps(&self) -> &[InstallStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
