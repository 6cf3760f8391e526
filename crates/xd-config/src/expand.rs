//! `${VAR}` references in `xd.toml` values.

use crate::ConfigError;

/// Substitute `${VAR}` and `${VAR:-default}` from the process environment.
///
/// Values without a `${` reference are returned as is. `field` names the
/// setting in the error for a variable that is unset and has no default.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    let lookup = |name: &str| std::env::var(name).map(Some).map_err(|_| name.to_owned());
    match shellexpand::env_with_context(value, lookup) {
        Ok(expanded) => Ok(expanded.into_owned()),
        Err(error) => Err(ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", error.cause),
        }),
    }
}
