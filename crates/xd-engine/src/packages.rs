//! Resolution of package files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use xd_document::{INPUT_PACKAGE, Package};

/// Failure to resolve a package file.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PackageError {
    #[error("Unknown package `{package}`")]
    UnknownPackage { package: String },
    #[error("Package `{package}` has no file `{file}`")]
    UnknownFile { package: String, file: String },
}

/// A file located inside a package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFile {
    pub package: String,
    /// Posix path relative to the package's source directory.
    pub relative_path: String,
    /// Location on disk.
    pub source: PathBuf,
}

/// Provides the files of all packages taking part in a run.
///
/// Packages are expected to be available locally before processing starts.
pub trait PackageProvider: Send + Sync {
    /// Locate `file` in `package`, or the package's root document when no
    /// file is given. `file` is already normalized relative to the package.
    fn resolve(&self, package: &str, file: Option<&str>) -> Result<ResolvedFile, PackageError>;
}

/// Packages from configuration plus the implicit input package.
#[derive(Debug, Default)]
pub struct PackageManager {
    packages: BTreeMap<String, Package>,
}

impl PackageManager {
    /// Create a manager holding only the input package.
    pub fn new(input: Package) -> Self {
        let mut manager = Self::default();
        manager.add(input);
        manager
    }

    /// Register a package, replacing any package with the same name.
    pub fn add(&mut self, package: Package) {
        tracing::debug!(package = %package.name, "Registered package");
        self.packages.insert(package.name.clone(), package);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// The root document of the input package.
    pub fn input_root(&self) -> Result<ResolvedFile, PackageError> {
        self.resolve(INPUT_PACKAGE, None)
    }
}

impl PackageProvider for PackageManager {
    fn resolve(&self, package: &str, file: Option<&str>) -> Result<ResolvedFile, PackageError> {
        let pkg = self
            .packages
            .get(package)
            .ok_or_else(|| PackageError::UnknownPackage {
                package: package.to_owned(),
            })?;

        let unknown_file = |file: &str| PackageError::UnknownFile {
            package: package.to_owned(),
            file: file.to_owned(),
        };

        let relative_path = file
            .or(pkg.root_doc.as_deref())
            .ok_or_else(|| unknown_file(""))?;
        let src_dir = pkg
            .src_dir
            .as_ref()
            .ok_or_else(|| unknown_file(relative_path))?;

        let source = src_dir.join(relative_path);
        if !source.is_file() {
            return Err(unknown_file(relative_path));
        }

        Ok(ResolvedFile {
            package: package.to_owned(),
            relative_path: relative_path.to_owned(),
            source,
        })
    }
}
