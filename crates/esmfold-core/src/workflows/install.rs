use crate::engine::config::EnvironmentConfig;
use crate::engine::environment::{InstallManifest, InstallPlan, StepAction};
use crate::engine::error::EngineError;
use crate::engine::inference::InferenceScript;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::{CommandRunner, ShellCommand};
use std::fs;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Re-run steps even when their sentinel exists.
    pub force: bool,
    /// Report what would run without touching the file system.
    pub dry_run: bool,
}

/// Step labels grouped by what happened to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
    /// Actions a dry run would have performed.
    pub planned: Vec<String>,
}

/// Builds the ESMFold environment in `env.home`.
///
/// Steps run in order from the package home. A step whose sentinel file exists
/// is skipped unless `options.force` is set; the first failing step aborts the
/// installation and leaves later sentinels untouched.
#[instrument(skip_all, name = "install_workflow", fields(home = %env.home.display()))]
pub fn run(
    manifest: &InstallManifest,
    env: &EnvironmentConfig,
    runner: &dyn CommandRunner,
    options: &InstallOptions,
    reporter: &ProgressReporter,
) -> Result<InstallReport, EngineError> {
    let plan = InstallPlan::new(manifest, env);
    let mut report = InstallReport::default();

    if !options.dry_run {
        fs::create_dir_all(&env.home).map_err(|e| EngineError::io(&env.home, e))?;
    }

    reporter.report(Progress::PhaseStart {
        name: "Installation",
    });
    info!("Installing {} into {}.", env.env_name, env.home.display());

    for (index, step) in plan.steps().iter().enumerate() {
        let sentinel = step.sentinel(&env.home);
        if !options.force && sentinel.exists() {
            info!(target = step.target, "Already done, skipping: {}", step.label);
            reporter.report(Progress::StepSkipped {
                label: step.label.clone(),
            });
            report.skipped.push(step.label.clone());
            continue;
        }

        if options.dry_run {
            let action = step.describe(env);
            reporter.report(Progress::Message(format!("[{}] {}", step.target, action)));
            report.planned.push(action);
            continue;
        }

        reporter.report(Progress::StepStart {
            index: index + 1,
            total: plan.len(),
            label: step.label.clone(),
        });
        match &step.action {
            StepAction::Shell(command) => {
                runner.run(&ShellCommand::new(command.clone()).in_dir(&env.home))?
            }
            StepAction::WriteScript => InferenceScript::install(&env.script_path)?,
        }
        fs::write(&sentinel, b"").map_err(|e| EngineError::io(&sentinel, e))?;
        reporter.report(Progress::StepFinish);
        report.executed.push(step.label.clone());
    }

    reporter.report(Progress::PhaseFinish);
    info!(
        executed = report.executed.len(),
        skipped = report.skipped.len(),
        "Installation finished."
    );
    Ok(report)
}
