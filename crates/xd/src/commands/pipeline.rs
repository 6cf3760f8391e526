//! Setup shared by `build` and `check`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use xd_config::Config;
use xd_document::Package;
use xd_engine::{
    FilterSpec, InsertionFilter, PackageManager, ProcessOutput, Processor, ProcessorConfig,
    TemplateSet,
};
use xd_reference::ApiReference;

use crate::error::CliError;

/// Root document and the directory of the input package.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct InputLocation {
    pub base_dir: PathBuf,
    /// Posix path of the root document relative to `base_dir`.
    pub root_doc: String,
}

/// Locate the root document inside the input package.
pub(super) fn locate_input(
    input: Option<&Path>,
    base_dir: Option<&Path>,
) -> Result<InputLocation, CliError> {
    let input = input.ok_or_else(|| {
        CliError::Validation("No input document given (pass INPUT or set build.input)".to_owned())
    })?;
    let absolute = |path: &Path| {
        std::path::absolute(path)
            .map_err(|e| CliError::Validation(format!("Invalid path {}: {e}", path.display())))
    };

    let input = absolute(input)?;
    let base_dir = match base_dir {
        Some(dir) => absolute(dir)?,
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let relative = input.strip_prefix(&base_dir).map_err(|_| {
        CliError::Validation(format!(
            "Input {} is not inside base directory {}",
            input.display(),
            base_dir.display()
        ))
    })?;
    let root_doc = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    Ok(InputLocation { base_dir, root_doc })
}

/// Run both passes with everything `config` describes.
pub(super) fn process(config: &Config) -> Result<ProcessOutput, CliError> {
    let build = &config.build_resolved;
    let location = locate_input(build.input.as_deref(), build.base_dir.as_deref())?;
    tracing::debug!(base_dir = %location.base_dir.display(), root = %location.root_doc, "Input");

    let mut packages = PackageManager::new(Package::input(&location.base_dir, location.root_doc));
    for package in &config.packages_resolved {
        packages.add(Package {
            name: package.name.clone(),
            src_dir: Some(package.src_dir.clone()),
            image_dir: package.image_dir.clone(),
            root_doc: package.root_doc.clone(),
        });
    }

    let mut reference = ApiReference::new();
    for file in &config.reference_files {
        reference.load_file(file)?;
    }
    tracing::info!(elements = reference.len(), "Loaded API reference");

    let templates = match &build.template_dir {
        Some(dir) => TemplateSet::load(dir)?,
        None => TemplateSet::builtin(),
    };

    let filter = InsertionFilter::new(
        config.filter.members::<FilterSpec>()?,
        config.filter.exceptions::<FilterSpec>()?,
    )?;
    let processor_config = ProcessorConfig {
        multipage: build.multipage,
        warnings_are_errors: build.warnings_are_errors,
        env: config.env.clone(),
        filter,
    };

    let root = packages.input_root()?;
    let processor = Processor::new(
        processor_config,
        Arc::new(reference),
        Arc::new(packages),
        Arc::new(templates),
    );
    Ok(processor.run(&root)?)
}

/// Write pages and artifacts below `build_dir`. Returns the number of files.
pub(super) fn write_output(build_dir: &Path, output: &ProcessOutput) -> Result<usize, CliError> {
    let files = output
        .pages
        .iter()
        .map(|page| (page.file.as_str(), page.text.as_str()))
        .chain(
            output
                .artifacts
                .iter()
                .map(|(file, text)| (file.as_str(), text.as_str())),
        );

    let mut count = 0;
    for (file, text) in files {
        write_file(&build_dir.join(file), text)?;
        count += 1;
    }
    Ok(count)
}

pub(super) fn write_file(path: &Path, text: &str) -> Result<(), CliError> {
    let write_error = |source| CliError::Write {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, text).map_err(write_error)?;
    tracing::debug!(path = %path.display(), "Wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use xd_config::CliSettings;

    fn write(dir: &Path, file: &str, text: &str) {
        let path = dir.join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn test_locate_input_defaults_to_input_directory() {
        let dir = TempDir::new().unwrap();
        let location = locate_input(Some(&dir.path().join("docs/index.adoc")), None).unwrap();
        assert_eq!(location.base_dir, dir.path().join("docs"));
        assert_eq!(location.root_doc, "index.adoc");
    }

    #[test]
    fn test_locate_input_inside_base_dir() {
        let dir = TempDir::new().unwrap();
        let location = locate_input(
            Some(&dir.path().join("docs/guide/index.adoc")),
            Some(&dir.path().join("docs")),
        )
        .unwrap();
        assert_eq!(location.root_doc, "guide/index.adoc");
    }

    #[test]
    fn test_locate_input_outside_base_dir() {
        let dir = TempDir::new().unwrap();
        let result = locate_input(
            Some(&dir.path().join("other/index.adoc")),
            Some(&dir.path().join("docs")),
        );
        assert!(matches!(result, Err(CliError::Validation(_))));
        assert!(matches!(
            locate_input(None, None),
            Err(CliError::Validation(_))
        ));
    }

    #[test]
    fn test_process_and_write() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "docs/index.adoc",
            "= Index\n\n::include[lib.adoc]{package=lib}\n::insert[log::Logger]{lang=cpp}\n",
        );
        write(dir.path(), "vendor/lib/lib.adoc", "= Library\n");
        write(
            dir.path(),
            "api.json",
            r#"{"elements": [{"id": "cpp-log-logger", "name": "Logger",
                "full_name": "log::Logger", "language": "cpp", "kind": "class"}]}"#,
        );
        write(
            dir.path(),
            "xd.toml",
            "[build]\ninput = \"docs/index.adoc\"\n\n\
             [reference]\nfiles = [\"api.json\"]\n\n\
             [packages.lib]\nsrc_dir = \"vendor/lib\"\n",
        );

        let settings = CliSettings {
            build_dir: Some(dir.path().join("out")),
            ..CliSettings::default()
        };
        let config = Config::load(Some(&dir.path().join("xd.toml")), Some(&settings)).unwrap();
        let output = process(&config).unwrap();
        assert!(output.warnings.is_empty());

        let count = write_output(&config.build_resolved.build_dir, &output).unwrap();
        assert_eq!(count, 3);
        let index = std::fs::read_to_string(dir.path().join("out/index.adoc")).unwrap();
        assert_eq!(
            index,
            "= Index\n\n[#top-lib-lib-top]\ninclude::lib.adoc[leveloffset=+1]\n\
             include::fragments/index/cpp-log-logger.adoc[leveloffset=+1]\n"
        );
        assert!(dir.path().join("out/lib.adoc").is_file());
        assert!(
            dir.path()
                .join("out/fragments/index/cpp-log-logger.adoc")
                .is_file()
        );
    }
}
