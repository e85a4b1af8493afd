use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileEnvironmentConfig};
use super::models::PredictAppConfig;
use crate::cli::{PredictArgs, SequenceInput};
use crate::error::{CliError, Result};
use crate::utils::parser;
use esmfold::core::scores::ScoreOptions;
use esmfold::core::sequence::Sequence;
use esmfold::engine::config::{EnvironmentConfig, PredictionConfigBuilder};
use esmfold::engine::environment::PackageSpec;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Reads the optional TOML file and layers `--set` overrides on top of it.
pub fn load_file_config(path: Option<&Path>, set_values: &[String]) -> Result<FileConfig> {
    let file_config = match path {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    apply_set_values(file_config, set_values)
}

pub fn build_environment(file_env: Option<FileEnvironmentConfig>, home: &Path) -> EnvironmentConfig {
    let defaults = DefaultsConfig::default();
    let file_env = file_env.unwrap_or_default();

    let mut env = EnvironmentConfig::new(home, &PackageSpec::ESM)
        .with_conda_hook(file_env.conda_hook.unwrap_or(defaults.conda_hook))
        .with_python(file_env.python.unwrap_or(defaults.python))
        .with_shell(file_env.shell.unwrap_or(defaults.shell));
    if let Some(script_path) = file_env.script_path {
        env = env.with_script_path(script_path);
    }
    env
}

pub fn build_predict_config(args: &PredictArgs, home: &Path) -> Result<PredictAppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(args.config.as_deref(), &args.set_values)?;

    let prediction_file = file_config.prediction.take().unwrap_or_default();
    let scores_file = file_config.scores.take().unwrap_or_default();

    let score = ScoreOptions {
        source: args
            .score_source
            .or(scores_file.source)
            .unwrap_or(defaults.score.source),
        reduction: scores_file.reduction.unwrap_or(defaults.score.reduction),
        duplicates: args
            .duplicates
            .or(scores_file.duplicates)
            .unwrap_or(defaults.score.duplicates),
    };

    let prediction = PredictionConfigBuilder::new()
        .model(args.model.or(prediction_file.model).unwrap_or(defaults.model))
        .gpu_id(args.gpu.or(prediction_file.gpu).unwrap_or(defaults.gpu))
        .chunk_size(
            args.chunk_size
                .or(prediction_file.chunk_size)
                .unwrap_or(defaults.chunk_size),
        )
        .num_recycles(
            args.num_recycles
                .or(prediction_file.num_recycles)
                .unwrap_or(defaults.num_recycles),
        )
        .score(score)
        .annotated_file_name(
            prediction_file
                .annotated_file_name
                .unwrap_or(defaults.annotated_file_name),
        )
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let sequence = read_sequence(&args.input, args.name.as_deref(), &defaults.sequence_name)?;
    debug!(
        "Prediction of '{}' ({} residues) configured: {:?}",
        sequence.name(),
        sequence.len(),
        prediction
    );

    Ok(PredictAppConfig {
        sequence,
        output_dir: args.output_dir.clone(),
        prediction,
        environment: build_environment(file_config.environment.take(), home),
        scores_csv: args.scores_csv.clone(),
    })
}

fn read_sequence(input: &SequenceInput, name: Option<&str>, default_name: &str) -> Result<Sequence> {
    match (&input.fasta, &input.sequence) {
        (Some(path), _) => {
            let record = Sequence::from_fasta_path(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
            let Some(name) = name else {
                return Ok(record);
            };
            let renamed = Sequence::new(name, record.residues())
                .map_err(|e| CliError::Argument(e.to_string()))?;
            Ok(match record.description() {
                Some(description) => renamed.with_description(description),
                None => renamed,
            })
        }
        (None, Some(residues)) => Sequence::new(name.unwrap_or(default_name), residues)
            .map_err(|e| CliError::Argument(e.to_string())),
        (None, None) => Err(CliError::Argument(
            "Either --fasta or --sequence must be given.".to_string(),
        )),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid integer value for {}: {}", key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let invalid = |e: parser::ParseError| CliError::Config(format!("{}: {}", key, e));

        match key.trim() {
            "prediction.model" => {
                config.prediction.get_or_insert_with(Default::default).model =
                    Some(parser::parse_model(value).map_err(invalid)?);
            }
            "prediction.gpu" => {
                config.prediction.get_or_insert_with(Default::default).gpu =
                    Some(parse_number(key, value)?);
            }
            "prediction.chunk-size" => {
                config.prediction.get_or_insert_with(Default::default).chunk_size =
                    Some(parse_number(key, value)?);
            }
            "prediction.num-recycles" => {
                config.prediction.get_or_insert_with(Default::default).num_recycles =
                    Some(parse_number(key, value)?);
            }
            "prediction.annotated-file-name" => {
                config
                    .prediction
                    .get_or_insert_with(Default::default)
                    .annotated_file_name = Some(value.to_string());
            }
            "scores.source" => {
                config.scores.get_or_insert_with(Default::default).source =
                    Some(parser::parse_score_source(value).map_err(invalid)?);
            }
            "scores.reduction" => {
                config.scores.get_or_insert_with(Default::default).reduction =
                    Some(parser::parse_score_reduction(value).map_err(invalid)?);
            }
            "scores.duplicates" => {
                config.scores.get_or_insert_with(Default::default).duplicates =
                    Some(parser::parse_duplicate_policy(value).map_err(invalid)?);
            }
            "environment.conda-hook" => {
                config.environment.get_or_insert_with(Default::default).conda_hook =
                    Some(value.to_string());
            }
            "environment.python" => {
                config.environment.get_or_insert_with(Default::default).python =
                    Some(value.to_string());
            }
            "environment.shell" => {
                config.environment.get_or_insert_with(Default::default).shell =
                    Some(value.to_string());
            }
            "environment.script-path" => {
                config.environment.get_or_insert_with(Default::default).script_path =
                    Some(value.into());
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
