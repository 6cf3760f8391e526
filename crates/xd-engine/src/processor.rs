//! Two-pass processing of a documentation tree.
//!
//! # Passes
//!
//! 1. **Discovery** processes the root document and, recursively, everything
//!    it includes or embeds. Output is discarded; the pass builds the
//!    document tree and registers inserted elements, links, anchors and
//!    output identities.
//! 2. **Generation** processes the same documents again with the registries
//!    complete, so links can point forward to content inserted later.
//!
//! Links to elements that were never inserted are reported after generation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use xd_document::DocId;
use xd_reference::ReferenceDatabase;

use crate::context::{Context, OutputKey, Phase, RunState, Scope, Services};
use crate::filter::InsertionFilter;
use crate::packages::{PackageProvider, ResolvedFile};
use crate::render::TemplateRenderer;
use crate::trace::Trace;
use crate::{ConsistencyError, EngineError};

/// Settings of a processing run.
#[derive(Clone, Debug, Default)]
pub struct ProcessorConfig {
    /// Produce one page per included document.
    pub multipage: bool,
    /// Raise warning-class errors instead of collecting them.
    pub warnings_are_errors: bool,
    /// Values available to templates.
    pub env: BTreeMap<String, String>,
    /// Filter applied to every insertion unless overridden.
    pub filter: InsertionFilter,
}

/// Generated text for one page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutputPage {
    /// Display name of the document.
    pub document: String,
    /// Output file relative to the build directory.
    pub file: String,
    pub title: String,
    pub text: String,
}

/// Where an element was inserted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InsertedElement {
    pub document: String,
    pub trace: Trace,
}

/// Where a named anchor is defined.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnchorRecord {
    pub document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_text: Option<String>,
}

/// Registries as they stood at the end of a run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ResolvedReferences {
    /// Inserted element ids.
    pub inserted: BTreeMap<String, InsertedElement>,
    /// Linked element ids with the traces of every link.
    pub linked: BTreeMap<String, Vec<Trace>>,
    pub anchors: BTreeMap<String, AnchorRecord>,
}

/// Result of a run.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Pages in reading order.
    pub pages: Vec<OutputPage>,
    /// Additional files keyed by path relative to the build directory.
    pub artifacts: BTreeMap<String, String>,
    /// Output identity of every processed document to the file holding it.
    pub output_files: BTreeMap<String, String>,
    /// Warnings collected while processing.
    pub warnings: Vec<EngineError>,
    pub references: ResolvedReferences,
}

/// Runs both passes over a documentation tree.
pub struct Processor {
    config: ProcessorConfig,
    services: Services,
}

impl Processor {
    #[must_use]
    pub fn new(
        config: ProcessorConfig,
        reference: Arc<dyn ReferenceDatabase>,
        packages: Arc<dyn PackageProvider>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            config,
            services: Services {
                reference,
                packages,
                renderer,
            },
        }
    }

    /// Process the tree starting at `root`.
    ///
    /// # Errors
    ///
    /// Returns the first error-class problem, or the first warning when
    /// warnings are errors.
    pub fn run(&self, root: &ResolvedFile) -> Result<ProcessOutput, EngineError> {
        let mut run = RunState::new();
        let root_id = run
            .tree
            .add_root(&root.package, &root.relative_path, root.source.clone());
        let scope = Scope {
            filter: self.config.filter.clone(),
            env: self.config.env.clone(),
            warnings_are_errors: self.config.warnings_are_errors,
            multipage: self.config.multipage,
            ..Scope::default()
        };

        tracing::info!(root = %run.tree.get(root_id), "Discovering documents");
        let mut ctx = Context::new(&mut run, &self.services, scope.clone(), root_id);
        ctx.register_output()?;
        ctx.process_document()?;

        run.phase = Phase::Generating;
        run.stack.clear();
        tracing::info!(
            documents = run.tree.len(),
            passes = run.progress.passes(Phase::Discovering),
            "Generating output"
        );
        Context::new(&mut run, &self.services, scope, root_id).generate_page()?;
        tracing::debug!(
            passes = run.progress.passes(Phase::Generating),
            "Generated output"
        );

        self.check_links(&mut run)?;
        Ok(collect(run, root_id))
    }

    /// Report every linked element that was not inserted anywhere.
    fn check_links(&self, run: &mut RunState) -> Result<(), EngineError> {
        let dangling: Vec<(String, Vec<Trace>)> = run
            .linked
            .iter()
            .filter(|(id, _)| !run.inserted.contains_key(*id))
            .map(|(id, traces)| (id.clone(), traces.clone()))
            .collect();

        for (id, traces) in dangling {
            let element = run
                .transcoded
                .get(&id)
                .cloned()
                .or_else(|| self.services.reference.find_by_id(&id))
                .map_or(id, |element| element.describe());
            let error: EngineError = ConsistencyError::DanglingLink { element, traces }.into();
            if self.config.warnings_are_errors {
                return Err(error);
            }
            run.warn(error);
        }
        Ok(())
    }
}

fn collect(mut run: RunState, root: DocId) -> ProcessOutput {
    let tree = &run.tree;

    let pages = tree
        .iter_all(root)
        .into_iter()
        .filter_map(|id| {
            let text = run.pages.remove(&id)?;
            let doc = tree.get(id);
            Some(OutputPage {
                document: doc.to_string(),
                file: doc.relative_path().to_owned(),
                title: doc.title().to_owned(),
                text,
            })
        })
        .collect();

    let output_files = run
        .outputs
        .keys()
        .iter()
        .map(|key| match *key {
            OutputKey::Document(id) => (
                tree.get(id).to_string(),
                tree.get(id).relative_path().to_owned(),
            ),
            OutputKey::Embedded { content, embedder } => (
                format!("{} (embedded in {})", tree.get(content), tree.get(embedder)),
                tree.get(tree.find_embedder(embedder))
                    .relative_path()
                    .to_owned(),
            ),
        })
        .collect();

    let references = ResolvedReferences {
        inserted: run
            .inserted
            .iter()
            .map(|(id, insertion)| {
                let record = InsertedElement {
                    document: tree.get(insertion.document).to_string(),
                    trace: insertion.trace.clone(),
                };
                (id.clone(), record)
            })
            .collect(),
        linked: std::mem::take(&mut run.linked),
        anchors: run
            .anchors
            .iter()
            .map(|(name, anchor)| {
                let record = AnchorRecord {
                    document: tree.get(anchor.document).to_string(),
                    link_text: anchor.link_text.clone(),
                };
                (name.clone(), record)
            })
            .collect(),
    };

    ProcessOutput {
        pages,
        artifacts: std::mem::take(&mut run.artifacts),
        output_files,
        warnings: std::mem::take(&mut run.warnings),
        references,
    }
}
