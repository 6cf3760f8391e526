//! Processing state.
//!
//! # Architecture
//!
//! State is split by how it propagates when an included or embedded document
//! is processed:
//!
//! - [`Scope`] is copied into every child context. Changes made while
//!   processing a child (language, namespace, filter) never leak back.
//! - [`RunState`] is shared by every context of a run. It holds the document
//!   tree and the registries that both passes converge on.
//!
//! A [`Context`] couples one document with a scope and a mutable borrow of the
//! run state. Child contexts reborrow the run state, so the type system keeps
//! the copy and share semantics apart.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use xd_document::{DocId, DocumentTree};
use xd_reference::{ReferableElement, ReferenceDatabase};

use crate::cache::DocumentCache;
use crate::command::Command;
use crate::directive::{ParsedDirective, expand};
use crate::filter::InsertionFilter;
use crate::packages::PackageProvider;
use crate::render::{RenderScope, TemplateRenderer};
use crate::trace::{StackFrame, Trace};
use crate::{ConsistencyError, EngineError};

/// Which pass is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Build the document tree and the registries. Output is discarded.
    Discovering,
    /// Produce the final text.
    Generating,
}

/// Settings copied into every child context.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scope {
    pub namespace: Option<String>,
    pub language: Option<String>,
    /// Language to transcode from when an element is missing in `language`.
    pub source_language: Option<String>,
    pub filter: InsertionFilter,
    pub env: BTreeMap<String, String>,
    pub warnings_are_errors: bool,
    pub multipage: bool,
    /// Output is folded into the embedding document.
    pub embedded: bool,
}

/// Collaborators of a run.
pub(crate) struct Services {
    pub reference: Arc<dyn ReferenceDatabase>,
    pub packages: Arc<dyn PackageProvider>,
    pub renderer: Arc<dyn TemplateRenderer>,
}

/// Where an element was inserted.
#[derive(Clone, Debug)]
pub(crate) struct Insertion {
    pub document: DocId,
    pub trace: Trace,
    /// Command that inserted the element.
    origin: (DocId, usize),
}

/// A named anchor.
#[derive(Clone, Debug)]
pub(crate) struct AnchorEntry {
    pub document: DocId,
    pub link_text: Option<String>,
    origin: (DocId, usize),
}

/// Identity of a produced output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum OutputKey {
    /// Root or included document with a page of its own.
    Document(DocId),
    /// Content folded into the output of `embedder`.
    Embedded { content: DocId, embedder: DocId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct OutputId(usize);

/// Output identities registered during discovery.
#[derive(Debug, Default)]
pub(crate) struct OutputRegistry {
    keys: Vec<OutputKey>,
    index: HashMap<OutputKey, OutputId>,
    /// Output file to the document writing it.
    files: HashMap<String, DocId>,
}

impl OutputRegistry {
    pub fn keys(&self) -> &[OutputKey] {
        &self.keys
    }

    fn register(&mut self, key: OutputKey) -> (OutputId, bool) {
        if let Some(&id) = self.index.get(&key) {
            return (id, false);
        }
        let id = OutputId(self.keys.len());
        self.keys.push(key);
        self.index.insert(key, id);
        (id, true)
    }
}

/// Document passes per phase.
///
/// Embedded documents are processed once per embedder, so passes can
/// outnumber the documents in the tree.
#[derive(Debug, Default)]
pub(crate) struct Progress {
    discovery: usize,
    generation: usize,
}

impl Progress {
    fn advance(&mut self, phase: Phase, documents: usize) {
        let passes = match phase {
            Phase::Discovering => &mut self.discovery,
            Phase::Generating => &mut self.generation,
        };
        *passes += 1;
        tracing::debug!(?phase, passes = *passes, documents, "Processed document");
    }

    pub(crate) fn passes(&self, phase: Phase) -> usize {
        match phase {
            Phase::Discovering => self.discovery,
            Phase::Generating => self.generation,
        }
    }
}

/// State shared by all contexts of a run.
pub(crate) struct RunState {
    pub phase: Phase,
    pub tree: DocumentTree,
    pub cache: DocumentCache,
    pub inserted: HashMap<String, Insertion>,
    /// Linked element ids with the traces of every link.
    pub linked: BTreeMap<String, Vec<Trace>>,
    pub anchors: HashMap<String, AnchorEntry>,
    pub stack: Vec<StackFrame>,
    pub outputs: OutputRegistry,
    /// Attachments seen during discovery as (parent, child, line).
    pub attach_origins: HashSet<(DocId, DocId, usize)>,
    /// Command that included each document, as (parent, line).
    pub include_edges: HashMap<DocId, (DocId, usize)>,
    /// Generated text per page.
    pub pages: HashMap<DocId, String>,
    /// Additional generated files keyed by path relative to the build directory.
    pub artifacts: BTreeMap<String, String>,
    /// Elements synthesized by transcoding, keyed by id.
    pub transcoded: HashMap<String, Arc<ReferableElement>>,
    pub warnings: Vec<EngineError>,
    reported: HashSet<String>,
    pub progress: Progress,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Discovering,
            tree: DocumentTree::new(),
            cache: DocumentCache::new(),
            inserted: HashMap::new(),
            linked: BTreeMap::new(),
            anchors: HashMap::new(),
            stack: Vec::new(),
            outputs: OutputRegistry::default(),
            attach_origins: HashSet::new(),
            include_edges: HashMap::new(),
            pages: HashMap::new(),
            artifacts: BTreeMap::new(),
            transcoded: HashMap::new(),
            warnings: Vec::new(),
            reported: HashSet::new(),
            progress: Progress::default(),
        }
    }

    /// Log and collect a warning. Repeats of the same message are dropped.
    pub fn warn(&mut self, warning: EngineError) {
        let message = warning.to_string();
        if self.reported.insert(message.clone()) {
            tracing::warn!("{message}");
            self.warnings.push(warning);
        }
    }
}

/// Processing state for one document.
pub(crate) struct Context<'r> {
    pub(crate) run: &'r mut RunState,
    pub(crate) services: &'r Services,
    pub(crate) scope: Scope,
    /// Document whose commands are executed.
    pub(crate) document: DocId,
    /// Document whose output receives the text.
    pub(crate) page: DocId,
    /// Document that embedded this one.
    pub(crate) embedder: Option<DocId>,
    /// Line of the command being executed.
    pub(crate) line: usize,
}

impl<'r> Context<'r> {
    pub(crate) fn new(
        run: &'r mut RunState,
        services: &'r Services,
        scope: Scope,
        document: DocId,
    ) -> Self {
        Self {
            run,
            services,
            scope,
            document,
            page: document,
            embedder: None,
            line: 0,
        }
    }

    /// Context for processing `document` from within this one.
    ///
    /// The scope is copied, the run state is shared.
    pub(crate) fn sub_context(&mut self, document: DocId, embedded: bool) -> Context<'_> {
        let mut scope = self.scope.clone();
        scope.embedded = embedded;
        Context {
            run: &mut *self.run,
            services: self.services,
            scope,
            document,
            page: if embedded { self.page } else { document },
            embedder: embedded.then_some(self.document),
            line: 0,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.run.phase
    }

    pub(crate) fn push_stack(&mut self, command: String, line: usize) {
        let document = self.run.tree.get(self.document).to_string();
        self.run.stack.push(StackFrame {
            command,
            document,
            line,
        });
    }

    pub(crate) fn pop_stack(&mut self) {
        self.run.stack.pop();
    }

    /// Snapshot of the current command stack.
    pub(crate) fn trace(&self) -> Trace {
        Trace(self.run.stack.clone())
    }

    /// Run all commands in the document and return the resulting text.
    pub(crate) fn process_document(&mut self) -> Result<String, EngineError> {
        let doc = self.run.tree.get(self.document);
        match self.run.phase {
            Phase::Discovering => tracing::info!(document = %doc, "Preprocessing"),
            Phase::Generating => tracing::info!(document = %doc, "Processing"),
        }
        let source = doc.source().to_owned();
        let text = self.run.cache.get(&source)?;
        self.run.tree.get(self.document).load_title(&text);

        let output = expand(&text, |directive, line| self.execute(directive, line))?;

        let documents = self.run.tree.len();
        self.run.progress.advance(self.run.phase, documents);
        Ok(output)
    }

    /// Execute one directive. Returns `None` when it is not a command.
    fn execute(
        &mut self,
        directive: &ParsedDirective,
        line: usize,
    ) -> Result<Option<String>, EngineError> {
        let Some(command) = Command::parse(directive) else {
            return Ok(None);
        };

        self.line = line;
        self.push_stack(Command::label(directive), line);
        let result = command
            .and_then(|command| self.run_command(command))
            .map_err(|e| e.with_trace(self.trace()));
        self.pop_stack();
        result.map(Some)
    }

    /// Raise `error` when warnings are errors, otherwise record it.
    pub(crate) fn warning_or_error(&mut self, error: EngineError) -> Result<(), EngineError> {
        if self.scope.warnings_are_errors {
            return Err(error);
        }
        let error = error.with_trace(self.trace());
        self.run.warn(error);
        Ok(())
    }

    /// Register the output of this context and return its identity.
    ///
    /// Registering again returns the same identity; embedded content gets
    /// a distinct identity per embedding document.
    pub(crate) fn register_output(&mut self) -> Result<OutputId, EngineError> {
        let key = match self.embedder {
            Some(embedder) => OutputKey::Embedded {
                content: self.document,
                embedder,
            },
            None => OutputKey::Document(self.document),
        };
        let (id, new) = self.run.outputs.register(key);
        if !new || self.embedder.is_some() {
            return Ok(id);
        }

        let file = self.run.tree.get(self.document).relative_path().to_owned();
        match self.run.outputs.files.get(&file) {
            Some(&other) if other != self.document => {
                let error = ConsistencyError::OutputCollision {
                    file,
                    first: self.run.tree.get(other).to_string(),
                    second: self.run.tree.get(self.document).to_string(),
                };
                self.warning_or_error(error.into())?;
            }
            _ => {
                tracing::debug!(file = %file, "Registered output");
                self.run.outputs.files.insert(file, self.document);
            }
        }
        Ok(id)
    }

    /// Record that `element` is inserted by the current command.
    pub(crate) fn insert(&mut self, element: &ReferableElement) -> Result<(), EngineError> {
        let Some(id) = &element.id else {
            return Ok(());
        };
        let origin = (self.document, self.line);

        let first = match self.run.inserted.get(id) {
            // Same command reached again through another embedding.
            Some(existing) if existing.origin == origin => return Ok(()),
            Some(existing) => existing.trace.clone(),
            None => {
                tracing::debug!(id = %id, document = %self.run.tree.get(self.document), "Inserted");
                let insertion = Insertion {
                    document: self.document,
                    trace: self.trace(),
                    origin,
                };
                self.run.inserted.insert(id.clone(), insertion);
                return Ok(());
            }
        };

        let error = ConsistencyError::DuplicateInsertion {
            element: element.describe(),
            first,
            second: self.trace(),
        };
        self.warning_or_error(error.into())
    }

    /// Record a link to the element with `id`.
    ///
    /// The target does not need to be inserted yet.
    pub(crate) fn link_to_element(&mut self, id: &str) {
        let trace = self.trace();
        self.run.linked.entry(id.to_owned()).or_default().push(trace);
    }

    /// Register a named anchor in the current document.
    pub(crate) fn register_anchor(
        &mut self,
        name: &str,
        link_text: Option<String>,
    ) -> Result<(), EngineError> {
        let origin = (self.document, self.line);
        match self.run.anchors.get(name) {
            Some(existing) if existing.origin == origin => Ok(()),
            Some(_) => self.warning_or_error(
                ConsistencyError::DuplicateAnchor {
                    name: name.to_owned(),
                }
                .into(),
            ),
            None => {
                self.run.anchors.insert(
                    name.to_owned(),
                    AnchorEntry {
                        document: self.document,
                        link_text,
                        origin,
                    },
                );
                Ok(())
            }
        }
    }

    /// Document and link text of a named anchor.
    pub(crate) fn link_to_anchor(
        &self,
        name: &str,
    ) -> Result<(DocId, Option<String>), EngineError> {
        self.run
            .anchors
            .get(name)
            .map(|anchor| (anchor.document, anchor.link_text.clone()))
            .ok_or_else(|| EngineError::UnknownAnchor {
                name: name.to_owned(),
            })
    }
}

impl RenderScope for Context<'_> {
    fn inserted(&mut self, element: &ReferableElement) -> Result<(), EngineError> {
        match self.run.phase {
            Phase::Discovering => self.insert(element),
            Phase::Generating => Ok(()),
        }
    }

    fn link(&mut self, id: &str, text: &str) -> Result<String, EngineError> {
        Ok(self.element_link(id, text))
    }

    fn environment(&self) -> &BTreeMap<String, String> {
        &self.scope.env
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use xd_reference::ApiReference;

    use crate::packages::PackageManager;
    use crate::render::TemplateSet;

    pub(crate) fn services() -> Services {
        Services {
            reference: Arc::new(ApiReference::new()),
            packages: Arc::new(PackageManager::default()),
            renderer: Arc::new(TemplateSet::builtin()),
        }
    }

    fn run_with_root() -> (RunState, DocId) {
        let mut run = RunState::new();
        let root = run.tree.add_root("INPUT", "index.adoc", "index.adoc".into());
        (run, root)
    }

    fn element(id: &str) -> ReferableElement {
        ReferableElement {
            id: Some(id.to_owned()),
            name: "Logger".to_owned(),
            full_name: "log::Logger".to_owned(),
            language: "cpp".to_owned(),
            kind: "class".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_comes_from_processed_text() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.adoc");
        std::fs::write(&path, "= Before\n\nText\n").unwrap();

        let mut run = RunState::new();
        let root = run.tree.add_root("INPUT", "index.adoc", path.clone());
        let services = services();
        let mut ctx = Context::new(&mut run, &services, Scope::default(), root);
        assert_eq!(ctx.process_document().unwrap(), "= Before\n\nText\n");

        std::fs::write(&path, "= After\n").unwrap();
        assert_eq!(ctx.process_document().unwrap(), "= Before\n\nText\n");
        assert_eq!(run.tree.get(root).title(), "Before");
    }

    #[test]
    fn test_progress_counts_passes_per_phase() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("shared.adoc"), "Shared\n").unwrap();

        let (mut run, root) = run_with_root();
        let shared = run
            .tree
            .add("INPUT", "shared.adoc", dir.path().join("shared.adoc"));
        let services = services();

        let mut ctx = Context::new(&mut run, &services, Scope::default(), root);
        ctx.sub_context(shared, true).process_document().unwrap();
        ctx.sub_context(shared, true).process_document().unwrap();
        ctx.sub_context(shared, true).process_document().unwrap();
        ctx.run.phase = Phase::Generating;
        ctx.sub_context(shared, true).process_document().unwrap();

        assert_eq!(run.progress.passes(Phase::Discovering), 3);
        assert_eq!(run.progress.passes(Phase::Generating), 1);
        assert_eq!(run.tree.len(), 2);
    }

    #[test]
    fn test_output_registration_is_idempotent() {
        let (mut run, root) = run_with_root();
        let services = services();
        let mut ctx = Context::new(&mut run, &services, Scope::default(), root);

        let first = ctx.register_output().unwrap();
        let second = ctx.register_output().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_embedded_outputs_are_distinct_per_embedder() {
        let (mut run, root) = run_with_root();
        let other = run.tree.add("INPUT", "other.adoc", "other.adoc".into());
        let shared = run.tree.add("INPUT", "shared.adoc", "shared.adoc".into());
        let services = services();

        let mut root_ctx = Context::new(&mut run, &services, Scope::default(), root);
        let from_root = root_ctx.sub_context(shared, true).register_output().unwrap();
        let again = root_ctx.sub_context(shared, true).register_output().unwrap();
        let mut other_ctx = Context::new(&mut run, &services, Scope::default(), other);
        let from_other = other_ctx.sub_context(shared, true).register_output().unwrap();

        assert_eq!(from_root, again);
        assert_ne!(from_root, from_other);
        assert_eq!(run.outputs.keys().len(), 2);
    }

    #[test]
    fn test_output_collision() {
        let (mut run, root) = run_with_root();
        let lib = run.tree.add("lib", "index.adoc", "lib/index.adoc".into());
        let services = services();

        Context::new(&mut run, &services, Scope::default(), root)
            .register_output()
            .unwrap();
        Context::new(&mut run, &services, Scope::default(), lib)
            .register_output()
            .unwrap();

        assert_eq!(run.warnings.len(), 1);
        assert_eq!(
            run.warnings[0].to_string(),
            "Documents index.adoc and [lib]:/index.adoc would both be written to index.adoc"
        );
    }

    #[test]
    fn test_duplicate_insertion_reports_both_traces() {
        let (mut run, root) = run_with_root();
        let services = services();
        let scope = Scope {
            warnings_are_errors: true,
            ..Scope::default()
        };
        let mut ctx = Context::new(&mut run, &services, scope, root);

        ctx.line = 3;
        ctx.push_stack("insert log::Logger".to_owned(), 3);
        ctx.insert(&element("cpp-logger")).unwrap();
        ctx.pop_stack();

        ctx.line = 9;
        ctx.push_stack("insert Logger".to_owned(), 9);
        let err = ctx.insert(&element("cpp-logger")).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Element cpp: log::Logger inserted multiple times.\n\
             First inserted at:\n  index.adoc:3: insert log::Logger\n\
             Inserted again at:\n  index.adoc:9: insert Logger"
        );
    }

    #[test]
    fn test_same_command_inserting_again_is_not_a_duplicate() {
        let (mut run, root) = run_with_root();
        let services = services();
        let mut ctx = Context::new(&mut run, &services, Scope::default(), root);

        ctx.line = 3;
        ctx.insert(&element("cpp-logger")).unwrap();
        ctx.insert(&element("cpp-logger")).unwrap();
        assert!(run.warnings.is_empty());
    }

    #[test]
    fn test_lenient_duplicate_insertion_is_collected() {
        let (mut run, root) = run_with_root();
        let services = services();
        let mut ctx = Context::new(&mut run, &services, Scope::default(), root);

        ctx.line = 3;
        ctx.insert(&element("cpp-logger")).unwrap();
        ctx.line = 4;
        ctx.insert(&element("cpp-logger")).unwrap();

        assert_eq!(run.warnings.len(), 1);
        assert!(run.warnings[0].is_warning());
    }

    #[test]
    fn test_sub_context_copies_scope() {
        let (mut run, root) = run_with_root();
        let child = run.tree.add("INPUT", "child.adoc", "child.adoc".into());
        let services = services();
        let scope = Scope {
            namespace: Some("log::".to_owned()),
            ..Scope::default()
        };
        let mut ctx = Context::new(&mut run, &services, scope, root);

        let mut sub = ctx.sub_context(child, false);
        assert_eq!(sub.scope.namespace.as_deref(), Some("log::"));
        sub.scope.namespace = None;
        sub.link_to_element("cpp-logger");

        assert_eq!(ctx.scope.namespace.as_deref(), Some("log::"));
        assert!(ctx.run.linked.contains_key("cpp-logger"));
    }

    #[test]
    fn test_embedded_sub_context_writes_to_embedder_page() {
        let (mut run, root) = run_with_root();
        let child = run.tree.add("INPUT", "child.adoc", "child.adoc".into());
        let services = services();
        let mut ctx = Context::new(&mut run, &services, Scope::default(), root);

        let embedded = ctx.sub_context(child, true);
        assert_eq!(embedded.page, root);
        assert_eq!(embedded.embedder, Some(root));
        assert!(embedded.scope.embedded);

        let included = ctx.sub_context(child, false);
        assert_eq!(included.page, child);
        assert_eq!(included.embedder, None);
    }

    #[test]
    fn test_anchors() {
        let (mut run, root) = run_with_root();
        let services = services();
        let mut ctx = Context::new(&mut run, &services, Scope::default(), root);

        ctx.line = 1;
        ctx.register_anchor("intro", Some("Introduction".to_owned()))
            .unwrap();
        assert_eq!(
            ctx.link_to_anchor("intro").unwrap(),
            (root, Some("Introduction".to_owned()))
        );
        assert!(matches!(
            ctx.link_to_anchor("missing"),
            Err(EngineError::UnknownAnchor { .. })
        ));

        ctx.line = 2;
        ctx.register_anchor("intro", None).unwrap();
        assert_eq!(
            run.warnings[0].to_string(),
            "Anchor with name `intro` inserted multiple times."
        );
    }

    #[test]
    fn test_repeated_warnings_are_reported_once() {
        let mut run = RunState::new();
        run.warn(EngineError::IncludeFileNotFound {
            file: "a.adoc".to_owned(),
        });
        run.warn(EngineError::IncludeFileNotFound {
            file: "a.adoc".to_owned(),
        });
        assert_eq!(run.warnings.len(), 1);
    }
}
