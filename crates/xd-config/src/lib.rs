//! Configuration management for xd.
//!
//! Parses `xd.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - every path in `[build]`, `[reference]` and `[packages.*]`
//! - every value in `[env]`

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Name reserved for the package holding the input document.
const INPUT_PACKAGE: &str = "INPUT";

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "xd.toml";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the root document.
    pub input: Option<PathBuf>,
    /// Override the input package directory.
    pub base_dir: Option<PathBuf>,
    /// Override the output directory.
    pub build_dir: Option<PathBuf>,
    /// Override page mode.
    pub multipage: Option<bool>,
    /// Override warnings-as-errors.
    pub warnings_are_errors: Option<bool>,
    /// Override the user template directory.
    pub template_dir: Option<PathBuf>,
    /// Reference files loaded after the configured ones.
    pub reference_files: Vec<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    build: BuildConfigRaw,
    reference: ReferenceConfigRaw,
    /// Global insertion filter.
    pub filter: FilterConfig,
    /// User-defined variables available to templates.
    pub env: BTreeMap<String, String>,
    packages: BTreeMap<String, PackageConfigRaw>,

    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
    /// Resolved reference files (set after loading).
    #[serde(skip)]
    pub reference_files: Vec<PathBuf>,
    /// Resolved packages in name order (set after loading).
    #[serde(skip)]
    pub packages_resolved: Vec<PackageConfig>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw build configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BuildConfigRaw {
    input: Option<String>,
    base_dir: Option<String>,
    build_dir: Option<String>,
    multipage: Option<bool>,
    warnings_are_errors: Option<bool>,
    template_dir: Option<String>,
}

/// Resolved build configuration with absolute paths.
#[derive(Debug, Default)]
pub struct BuildConfig {
    /// Root document of the run.
    pub input: Option<PathBuf>,
    /// Directory of the input package. Defaults to the input's directory.
    pub base_dir: Option<PathBuf>,
    /// Directory receiving all generated files.
    pub build_dir: PathBuf,
    /// Produce one output file per included document.
    pub multipage: bool,
    /// Raise warning-class conditions instead of logging them.
    pub warnings_are_errors: bool,
    /// Directory with user templates (`<lang>/<kind>.adoc`).
    pub template_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ReferenceConfigRaw {
    files: Vec<String>,
}

/// Global insertion filter as written in the config file.
///
/// The values keep their TOML shape; use [`FilterConfig::members`] and
/// [`FilterConfig::exceptions`] to decode them into the filter type.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    members: Option<toml::Value>,
    exceptions: Option<toml::Value>,
}

impl FilterConfig {
    /// Decode the member filter.
    pub fn members<T: DeserializeOwned>(&self) -> Result<Option<T>, ConfigError> {
        decode(self.members.as_ref(), "filter.members")
    }

    /// Decode the exception filter.
    pub fn exceptions<T: DeserializeOwned>(&self) -> Result<Option<T>, ConfigError> {
        decode(self.exceptions.as_ref(), "filter.exceptions")
    }
}

fn decode<T: DeserializeOwned>(
    value: Option<&toml::Value>,
    field: &str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            v.clone()
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::Validation(format!("{field}: {e}")))
        })
        .transpose()
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PackageConfigRaw {
    src_dir: Option<String>,
    image_dir: Option<String>,
    root_doc: Option<String>,
}

/// Resolved content package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConfig {
    pub name: String,
    pub src_dir: PathBuf,
    pub image_dir: Option<PathBuf>,
    pub root_doc: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`packages.lib.src_dir`").
        field: String,
        /// Error message (e.g., "${`LIB_DIR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `xd.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        let build = &mut self.build_resolved;
        if let Some(input) = &settings.input {
            build.input = Some(input.clone());
        }
        if let Some(base_dir) = &settings.base_dir {
            build.base_dir = Some(base_dir.clone());
        }
        if let Some(build_dir) = &settings.build_dir {
            build.build_dir.clone_from(build_dir);
        }
        if let Some(multipage) = settings.multipage {
            build.multipage = multipage;
        }
        if let Some(warnings_are_errors) = settings.warnings_are_errors {
            build.warnings_are_errors = warnings_are_errors;
        }
        if let Some(template_dir) = &settings.template_dir {
            build.template_dir = Some(template_dir.clone());
        }
        self.reference_files
            .extend(settings.reference_files.iter().cloned());
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            build: BuildConfigRaw::default(),
            reference: ReferenceConfigRaw::default(),
            filter: FilterConfig::default(),
            env: BTreeMap::new(),
            packages: BTreeMap::new(),
            build_resolved: BuildConfig {
                build_dir: base.join("build"),
                ..BuildConfig::default()
            },
            reference_files: Vec::new(),
            packages_resolved: Vec::new(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for package in &self.packages_resolved {
            require_non_empty(&package.name, "packages.<name>")?;
            if package.name == INPUT_PACKAGE {
                return Err(ConfigError::Validation(format!(
                    "package name {INPUT_PACKAGE} is reserved"
                )));
            }
            if let Some(root_doc) = &package.root_doc {
                let field = format!("packages.{}.root_doc", package.name);
                require_non_empty(root_doc, &field)?;
                if root_doc.starts_with('/') || Path::new(root_doc).is_absolute() {
                    return Err(ConfigError::Validation(format!(
                        "{field} must be relative to the package"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let build = &mut self.build;
        for (value, field) in [
            (&mut build.input, "build.input"),
            (&mut build.base_dir, "build.base_dir"),
            (&mut build.build_dir, "build.build_dir"),
            (&mut build.template_dir, "build.template_dir"),
        ] {
            if let Some(v) = value {
                *v = expand::expand_env(v, field)?;
            }
        }

        for (i, file) in self.reference.files.iter_mut().enumerate() {
            *file = expand::expand_env(file, &format!("reference.files[{i}]"))?;
        }

        for (key, value) in &mut self.env {
            *value = expand::expand_env(value, &format!("env.{key}"))?;
        }

        for (name, package) in &mut self.packages {
            if let Some(dir) = &mut package.src_dir {
                *dir = expand::expand_env(dir, &format!("packages.{name}.src_dir"))?;
            }
            if let Some(dir) = &mut package.image_dir {
                *dir = expand::expand_env(dir, &format!("packages.{name}.image_dir"))?;
            }
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    ///
    /// Validates that every package has a `src_dir`.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let resolve = |path: Option<&str>| path.map(|p| config_dir.join(p));

        self.build_resolved = BuildConfig {
            input: resolve(self.build.input.as_deref()),
            base_dir: resolve(self.build.base_dir.as_deref()),
            build_dir: config_dir.join(self.build.build_dir.as_deref().unwrap_or("build")),
            multipage: self.build.multipage.unwrap_or(false),
            warnings_are_errors: self.build.warnings_are_errors.unwrap_or(false),
            template_dir: resolve(self.build.template_dir.as_deref()),
        };

        self.reference_files = self
            .reference
            .files
            .iter()
            .map(|f| config_dir.join(f))
            .collect();

        self.packages_resolved = self
            .packages
            .iter()
            .map(|(name, raw)| {
                let src_dir = raw.src_dir.as_deref().ok_or_else(|| {
                    ConfigError::Validation(format!("packages.{name}.src_dir is required"))
                })?;
                Ok(PackageConfig {
                    name: name.clone(),
                    src_dir: config_dir.join(src_dir),
                    image_dir: resolve(raw.image_dir.as_deref()),
                    root_doc: raw.root_doc.clone(),
                })
            })
            .collect::<Result<_, ConfigError>>()?;

        Ok(())
    }
}
