//! `xd build` command implementation.

use std::collections::BTreeMap;

use clap::Args;
use serde::Serialize;
use xd_config::Config;
use xd_engine::ResolvedReferences;

use super::RunArgs;
use super::pipeline::{process, write_file, write_output};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub(crate) run: RunArgs,

    /// Write debug.json with the resolved references.
    #[arg(long)]
    debug: bool,
}

/// Contents of `debug.json`.
#[derive(Serialize)]
struct DebugDump<'a> {
    output_files: &'a BTreeMap<String, String>,
    references: &'a ResolvedReferences,
}

impl BuildArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let settings = self.run.cli_settings();
        let config = Config::load(self.run.config.as_deref(), Some(&settings))?;
        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }
        let build_dir = &config.build_resolved.build_dir;
        output.info(&format!("Output: {}", build_dir.display()));

        let result = process(&config)?;
        for warning in &result.warnings {
            output.warning(&format!("Warning: {warning}"));
        }

        let count = write_output(build_dir, &result)?;
        if self.debug {
            let dump = DebugDump {
                output_files: &result.output_files,
                references: &result.references,
            };
            write_file(
                &build_dir.join("debug.json"),
                &serde_json::to_string_pretty(&dump)?,
            )?;
        }

        output.success(&format!(
            "Wrote {count} files to {} ({} warnings)",
            build_dir.display(),
            result.warnings.len()
        ));
        Ok(())
    }
}
