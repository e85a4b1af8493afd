use crate::cli::InstallArgs;
use crate::config::{build_environment, load_file_config};
use crate::error::Result;
use crate::home::PackageHome;
use crate::utils::progress::CliProgressHandler;
use esmfold::{
    engine::{environment::InstallManifest, progress::ProgressReporter, runner::SystemShell},
    workflows::install::{self, InstallOptions},
};
use tracing::info;

pub async fn run(args: InstallArgs) -> Result<()> {
    let home = PackageHome::new()?;
    let mut file_config = load_file_config(args.config.as_deref(), &args.set_values)?;
    let env = build_environment(file_config.environment.take(), home.path());

    let manifest = match &args.manifest {
        Some(path) => {
            info!("Using install manifest {:?}", path);
            InstallManifest::from_path(path)?
        }
        None => InstallManifest::embedded()?,
    };

    let runner = SystemShell::new(env.shell.clone());
    let options = InstallOptions {
        force: args.force,
        dry_run: args.dry_run,
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    if options.dry_run {
        println!("Dry run: nothing will be executed.");
    }
    println!("Installing ESMFold into {}", env.home.display());

    let report = tokio::task::block_in_place(|| {
        install::run(&manifest, &env, &runner, &options, &reporter)
    })?;

    if options.dry_run {
        println!("{} step(s) would run.", report.planned.len());
    } else {
        println!(
            "✓ {} step(s) executed, {} already done.",
            report.executed.len(),
            report.skipped.len()
        );
        println!("Activate the environment with: {}", env.activation_command());
    }
    Ok(())
}
