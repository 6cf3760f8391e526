//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod check;
mod pipeline;

pub(crate) use build::BuildArgs;
pub(crate) use check::CheckArgs;

use std::path::PathBuf;

use clap::Args;
use xd_config::CliSettings;

/// Arguments shared by every command that processes documentation.
#[derive(Args)]
pub(crate) struct RunArgs {
    /// Root document (overrides config).
    input: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover xd.toml).
    #[arg(short, long, env = "XD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of the input package (default: directory of the input).
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(long)]
    build_dir: Option<PathBuf>,

    /// Write one page per included document.
    #[arg(long)]
    multipage: bool,

    /// Fail on the first warning.
    #[arg(long)]
    warnings_are_errors: bool,

    /// Directory with user templates (`<lang>/<kind>.adoc`).
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Additional reference file. May be repeated.
    #[arg(long = "reference", value_name = "FILE")]
    references: Vec<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl RunArgs {
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            input: self.input.clone(),
            base_dir: self.base_dir.clone(),
            build_dir: self.build_dir.clone(),
            multipage: self.multipage.then_some(true),
            warnings_are_errors: self.warnings_are_errors.then_some(true),
            template_dir: self.template_dir.clone(),
            reference_files: self.references.clone(),
        }
    }
}
