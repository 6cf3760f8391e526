//! Errors raised while processing documents.

use std::path::PathBuf;
use std::sync::Arc;

use xd_document::GraphError;
use xd_reference::ReferableElement;

use crate::trace::{Trace, format_traces};

/// Errors raised by commands and the processor.
///
/// Warning-class errors (see [`EngineError::is_warning`]) are only raised
/// when warnings are treated as errors; otherwise they are logged and
/// collected while processing continues with degraded output.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(
        "Multiple matches for {name}. Please provide more details.\nMatching candidates:\n{}",
        describe_candidates(.candidates)
    )]
    AmbiguousReference {
        name: String,
        candidates: Vec<Arc<ReferableElement>>,
    },

    #[error(
        "Cannot find {} {name} for {}",
        .kind.as_deref().unwrap_or("any"),
        .lang.as_deref().unwrap_or("any")
    )]
    ReferenceNotFound {
        name: String,
        kind: Option<String>,
        lang: Option<String>,
    },

    #[error(
        "Cannot link to {} {name} for {}. The element has no id to link to.",
        .kind.as_deref().unwrap_or("any"),
        .lang.as_deref().unwrap_or("any")
    )]
    Unlinkable {
        name: String,
        kind: Option<String>,
        lang: Option<String>,
    },

    #[error("Include file not found: {file}")]
    IncludeFileNotFound { file: String },

    #[error("The package `{package}` is not available.")]
    MissingPackage { package: String },

    #[error("Package `{package}` does not contain file `{file}`.")]
    MissingPackageFile { package: String, file: String },

    #[error("There is no template to render a {kind} for {lang}")]
    TemplateMissing { lang: String, kind: String },

    #[error("Invalid API call: {0}")]
    InvalidApiCall(String),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error("Anchor with name `{name}` does not exist.")]
    UnknownAnchor { name: String },

    #[error(
        "Input file requires version {required} of xd. Current version {current} is not compatible."
    )]
    IncompatibleVersion { required: String, current: String },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Error raised inside a command, with the commands leading to it.
    #[error("{source}\nCommand trace:\n{trace}")]
    InCommand {
        trace: Trace,
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Whether the error is only a warning unless warnings are errors.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        match self {
            Self::ReferenceNotFound { .. }
            | Self::Unlinkable { .. }
            | Self::IncludeFileNotFound { .. }
            | Self::MissingPackage { .. }
            | Self::MissingPackageFile { .. }
            | Self::Consistency(_)
            | Self::UnknownAnchor { .. } => true,
            Self::InCommand { source, .. } => source.is_warning(),
            _ => false,
        }
    }

    /// The underlying error, without command provenance.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::InCommand { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Attach the command trace, unless one is attached already.
    #[must_use]
    pub fn with_trace(self, trace: Trace) -> Self {
        if matches!(self, Self::InCommand { .. }) || trace.is_empty() {
            self
        } else {
            Self::InCommand {
                trace,
                source: Box::new(self),
            }
        }
    }
}

/// The documentation as a whole is inconsistent.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("Element {element} inserted multiple times.\nFirst inserted at:\n{first}\nInserted again at:\n{second}")]
    DuplicateInsertion {
        element: String,
        first: Trace,
        second: Trace,
    },

    #[error("Anchor with name `{name}` inserted multiple times.")]
    DuplicateAnchor { name: String },

    #[error(transparent)]
    DuplicateInclude(#[from] GraphError),

    #[error(
        "{element} not included in documentation, but linked here:\n{}",
        format_traces(.traces)
    )]
    DanglingLink { element: String, traces: Vec<Trace> },

    #[error(
        "{document} is embedded in unrelated documents {}; a single page cannot link to all of them",
        .candidates.join(", ")
    )]
    DivergentEmbedding {
        document: String,
        candidates: Vec<String>,
    },

    #[error(
        "Invalid cross-reference from document '{from}' to document '{target}'. The referenced document is not included anywhere across the whole documentation tree."
    )]
    UnusedDocument { from: String, target: String },

    #[error("Documents {first} and {second} would both be written to {file}")]
    OutputCollision {
        file: String,
        first: String,
        second: String,
    },
}

fn describe_candidates(candidates: &[Arc<ReferableElement>]) -> String {
    candidates
        .iter()
        .map(|element| {
            let signature = if element.kind == "function" {
                let types: Vec<String> = element.params.iter().map(|p| p.ty.to_string()).collect();
                format!("({})", types.join(", "))
            } else {
                String::new()
            };
            format!(
                "{} {} {}{signature}",
                element.language, element.kind, element.full_name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use xd_reference::{Parameter, TypeRef};

    use crate::trace::StackFrame;

    fn element(language: &str, kind: &str, full_name: &str) -> Arc<ReferableElement> {
        Arc::new(ReferableElement {
            full_name: full_name.to_owned(),
            language: language.to_owned(),
            kind: kind.to_owned(),
            ..Default::default()
        })
    }

    #[test]
    fn test_not_found_message() {
        let err = EngineError::ReferenceNotFound {
            name: "Logger".to_owned(),
            kind: None,
            lang: Some("cpp".to_owned()),
        };
        assert_eq!(err.to_string(), "Cannot find any Logger for cpp");
        assert!(err.is_warning());
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let mut write = (*element("cpp", "function", "log::Write")).clone();
        write.params = vec![Parameter {
            name: "level".to_owned(),
            ty: TypeRef {
                name: "int".to_owned(),
                ..Default::default()
            },
            description: String::new(),
        }];
        let err = EngineError::AmbiguousReference {
            name: "Logger".to_owned(),
            candidates: vec![
                element("cpp", "class", "Logger"),
                element("java", "class", "Logger"),
                Arc::new(write),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Multiple matches for Logger. Please provide more details.\n\
             Matching candidates:\n\
             cpp class Logger\n\
             java class Logger\n\
             cpp function log::Write(int)"
        );
        assert!(!err.is_warning());
    }

    #[test]
    fn test_with_trace_wraps_once() {
        let trace = Trace(vec![StackFrame {
            command: "insert Logger".to_owned(),
            document: "index.adoc".to_owned(),
            line: 4,
        }]);
        let err = EngineError::InvalidApiCall("bad".to_owned())
            .with_trace(trace.clone())
            .with_trace(trace);
        assert_eq!(
            err.to_string(),
            "Invalid API call: bad\nCommand trace:\n  index.adoc:4: insert Logger"
        );
        assert!(matches!(err.root_cause(), EngineError::InvalidApiCall(_)));
    }

    #[test]
    fn test_consistency_errors_are_warnings() {
        let err: EngineError = ConsistencyError::DuplicateAnchor {
            name: "x".to_owned(),
        }
        .into();
        assert!(err.is_warning());
        assert_eq!(err.to_string(), "Anchor with name `x` inserted multiple times.");
    }
}
