//! `xd check` command implementation.

use clap::Args;
use xd_config::Config;

use super::RunArgs;
use super::pipeline::process;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    #[command(flatten)]
    pub(crate) run: RunArgs,
}

impl CheckArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let settings = self.run.cli_settings();
        let config = Config::load(self.run.config.as_deref(), Some(&settings))?;

        let result = process(&config)?;
        for warning in &result.warnings {
            output.warning(&format!("Warning: {warning}"));
        }
        if !result.warnings.is_empty() {
            return Err(CliError::Validation(format!(
                "{} problems found",
                result.warnings.len()
            )));
        }

        output.success(&format!(
            "{} pages checked, no problems found",
            result.pages.len()
        ));
        Ok(())
    }
}
