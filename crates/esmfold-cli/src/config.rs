//! CLI configuration. Command-line flags take precedence over `--set`
//! overrides, which take precedence over the TOML file and then the defaults.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{build_environment, build_predict_config, load_file_config};
