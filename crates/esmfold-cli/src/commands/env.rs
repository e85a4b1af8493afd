use crate::cli::{EnvArgs, EnvCommands};
use crate::config::{build_environment, load_file_config};
use crate::error::Result;
use crate::home::PackageHome;
use esmfold::engine::inference::InferenceScript;
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(args: EnvArgs) -> Result<()> {
    match args.command {
        EnvCommands::Path => {
            handle_path()?;
        }
        EnvCommands::SetPath { path } => {
            handle_set_path(path)?;
        }
        EnvCommands::ResetPath => {
            handle_reset_path()?;
        }
        EnvCommands::Activate { config } => {
            handle_activate(config.as_deref())?;
        }
        EnvCommands::WriteScript { path } => {
            handle_write_script(&path)?;
        }
    }
    Ok(())
}

fn handle_path() -> Result<()> {
    let home = PackageHome::new()?;
    println!("{}", home.path().display());
    Ok(())
}

fn handle_set_path(path: PathBuf) -> Result<()> {
    info!("Setting custom package home to {:?}", &path);
    PackageHome::set_custom_path(&path)?;
    println!("✓ Package home set to: {}", path.display());
    println!("Run 'esmfold install' to install ESMFold there.");
    Ok(())
}

fn handle_reset_path() -> Result<()> {
    PackageHome::reset_path()?;
    let home = PackageHome::new()?;
    println!("✓ Package home reset to: {}", home.path().display());
    Ok(())
}

fn handle_activate(config: Option<&Path>) -> Result<()> {
    let home = PackageHome::new()?;
    let mut file_config = load_file_config(config, &[])?;
    let env = build_environment(file_config.environment.take(), home.path());
    println!("{}", env.activation_command());
    Ok(())
}

fn handle_write_script(path: &Path) -> Result<()> {
    InferenceScript::install(path)?;
    println!("✓ Inference script written to: {}", path.display());
    Ok(())
}
