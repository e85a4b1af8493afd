use crate::utils::parser;
use clap::{Args, Parser, Subcommand};
use esmfold::core::scores::{DuplicatePolicy, ScoreReduction, ScoreSource};
use esmfold::engine::config::EsmModel;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "ESMFold runner - install ESMFold, predict protein structures and annotate them with per-residue confidence.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clone ESM and build the ESMFold conda environment in the package home.
    Install(InstallArgs),
    /// Predict the structure of a sequence and write an annotated mmCIF file.
    Predict(PredictArgs),
    /// Annotate an existing ESMFold PDB file with per-residue scores.
    Annotate(AnnotateArgs),
    /// Print the ESMFoldScore table stored in an annotated mmCIF file.
    Scores(ScoresArgs),
    /// Inspect and manage the package home.
    Env(EnvArgs),
}

/// Arguments for the `install` subcommand.
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Re-run every step even if it already completed.
    #[arg(long)]
    pub force: bool,

    /// Print the install commands without running them.
    #[arg(long)]
    pub dry_run: bool,

    /// Use a custom install manifest (TOML) instead of the bundled one.
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Configuration file whose [environment] section describes the conda setup.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value. Example: -S environment.python=python3
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Where the input sequence comes from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SequenceInput {
    /// FASTA file; the first record is predicted.
    #[arg(long, value_name = "PATH")]
    pub fasta: Option<PathBuf>,

    /// Amino-acid sequence given directly on the command line.
    #[arg(long, value_name = "SEQ")]
    pub sequence: Option<String>,
}

/// Arguments for the `predict` subcommand.
#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub input: SequenceInput,

    /// Name of the prediction; defaults to the FASTA record name or 'sequence'.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Directory for the raw PDB and the annotated mmCIF.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the pretrained model.
    #[arg(short, long, value_name = "NAME", value_parser = parser::parse_model)]
    pub model: Option<EsmModel>,

    /// Override the CUDA device index.
    #[arg(short, long, value_name = "INDEX")]
    pub gpu: Option<u32>,

    /// Override the chunk size (lower uses less GPU memory).
    #[arg(long, value_name = "INT")]
    pub chunk_size: Option<u32>,

    /// Override the number of recycles.
    #[arg(long, value_name = "INT")]
    pub num_recycles: Option<u32>,

    /// Atom field holding the confidence ('b-factor' or 'occupancy').
    #[arg(long, value_name = "SOURCE", value_parser = parser::parse_score_source)]
    pub score_source: Option<ScoreSource>,

    /// Policy for residues scored twice ('reject', 'first-wins' or 'last-wins').
    #[arg(long, value_name = "POLICY", value_parser = parser::parse_duplicate_policy)]
    pub duplicates: Option<DuplicatePolicy>,

    /// Also export the scores as CSV.
    #[arg(long, value_name = "PATH")]
    pub scores_csv: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S prediction.chunk-size=64
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `annotate` subcommand.
#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// PDB file written by ESMFold.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the annotated mmCIF file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Atom field holding the confidence ('b-factor' or 'occupancy').
    #[arg(long, value_name = "SOURCE", value_parser = parser::parse_score_source)]
    pub score_source: Option<ScoreSource>,

    /// How atom values become one residue score ('first-atom' or 'mean').
    #[arg(long, value_name = "MODE", value_parser = parser::parse_score_reduction)]
    pub reduction: Option<ScoreReduction>,

    /// Policy for residues scored twice ('reject', 'first-wins' or 'last-wins').
    #[arg(long, value_name = "POLICY", value_parser = parser::parse_duplicate_policy)]
    pub duplicates: Option<DuplicatePolicy>,

    /// Also export the scores as CSV.
    #[arg(long, value_name = "PATH")]
    pub scores_csv: Option<PathBuf>,
}

/// Arguments for the `scores` subcommand.
#[derive(Args, Debug)]
pub struct ScoresArgs {
    /// Annotated mmCIF file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Write the table as CSV instead of printing it.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

/// Arguments for the `env` subcommand.
#[derive(Args, Debug)]
pub struct EnvArgs {
    #[command(subcommand)]
    pub command: EnvCommands,
}

/// Available commands for package-home management.
#[derive(Subcommand, Debug)]
pub enum EnvCommands {
    /// Show the absolute path to the package home.
    Path,
    /// Set a custom path for the package home.
    SetPath {
        /// The directory to install ESMFold into.
        #[arg(required = true)]
        path: PathBuf,
    },
    /// Reset the package home to its default, OS-specific location.
    ResetPath,
    /// Print the shell command that activates the ESMFold environment.
    Activate {
        /// Configuration file whose [environment] section describes the conda setup.
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Write the bundled inference script to a file.
    WriteScript {
        #[arg(required = true)]
        path: PathBuf,
    },
}
