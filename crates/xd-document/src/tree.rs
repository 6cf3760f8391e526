//! Arena holding all documents of a run.
//!
//! # Architecture
//!
//! Documents are stored in a flat `Vec<Document>`; relationships are tracked
//! by [`DocId`] in both directions:
//! - `children` lists included and embedded children in attachment order
//! - `included_in` points at the single owning parent
//! - `embedded_in` lists every embedding parent
//!
//! Page navigation only follows inclusion edges.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::document::{DocId, Document};

/// Violations of the inclusion and embedding rules.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("{document} cannot include or embed itself")]
    SelfReference { document: String },
    #[error("{document} has been included multiple times")]
    AlreadyIncluded { document: String },
    #[error("{document} is both included and embedded")]
    IncludedAndEmbedded { document: String },
    #[error("{document} is already an ancestor of {parent}")]
    Cycle { document: String, parent: String },
}

/// All documents taking part in a run, keyed by package and relative path.
#[derive(Debug, Default)]
pub struct DocumentTree {
    documents: Vec<Document>,
    index: HashMap<(String, String), DocId>,
}

impl DocumentTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the document for a package file.
    pub fn add(&mut self, package: &str, relative_path: &str, source: PathBuf) -> DocId {
        let key = (package.to_owned(), relative_path.to_owned());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = DocId(self.documents.len());
        self.documents
            .push(Document::new(package, relative_path, source));
        self.index.insert(key, id);
        id
    }

    /// Get or create a document and mark it as the root of the tree.
    pub fn add_root(&mut self, package: &str, relative_path: &str, source: PathBuf) -> DocId {
        let id = self.add(package, relative_path, source);
        self.documents[id.0].is_root = true;
        id
    }

    #[must_use]
    pub fn find(&self, package: &str, relative_path: &str) -> Option<DocId> {
        self.index
            .get(&(package.to_owned(), relative_path.to_owned()))
            .copied()
    }

    /// Access a document by id.
    ///
    /// Ids are only handed out by this tree, so lookups cannot fail.
    #[must_use]
    pub fn get(&self, id: DocId) -> &Document {
        &self.documents[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All document ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = DocId> + use<> {
        (0..self.documents.len()).map(DocId)
    }

    /// Record that `parent` includes `child`.
    ///
    /// A document can only be included once, cannot also be embedded, and
    /// cannot include one of its own ancestors.
    pub fn include(&mut self, parent: DocId, child: DocId) -> Result<(), GraphError> {
        self.check_attach(parent, child)?;
        let doc = self.get(child);
        if doc.is_included() {
            return Err(GraphError::AlreadyIncluded {
                document: doc.to_string(),
            });
        }
        if doc.is_embedded() {
            return Err(GraphError::IncludedAndEmbedded {
                document: doc.to_string(),
            });
        }
        self.documents[child.0].included_in = Some(parent);
        self.documents[parent.0].children.push(child);
        Ok(())
    }

    /// Record that `parent` embeds `child`.
    ///
    /// Embedding the same child again from the same parent is a no-op.
    pub fn embed(&mut self, parent: DocId, child: DocId) -> Result<(), GraphError> {
        self.check_attach(parent, child)?;
        let doc = self.get(child);
        if doc.is_included() {
            return Err(GraphError::IncludedAndEmbedded {
                document: doc.to_string(),
            });
        }
        if doc.embedded_in.contains(&parent) {
            return Ok(());
        }
        self.documents[child.0].embedded_in.push(parent);
        self.documents[parent.0].children.push(child);
        Ok(())
    }

    fn check_attach(&self, parent: DocId, child: DocId) -> Result<(), GraphError> {
        if parent == child {
            return Err(GraphError::SelfReference {
                document: self.get(child).to_string(),
            });
        }
        if self.get(child).is_root || self.is_ancestor(child, parent) {
            return Err(GraphError::Cycle {
                document: self.get(child).to_string(),
                parent: self.get(parent).to_string(),
            });
        }
        Ok(())
    }

    /// Whether `ancestor` can be reached from `id` over any parent edge.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: DocId, id: DocId) -> bool {
        let mut stack = vec![id];
        let mut seen = vec![false; self.documents.len()];
        while let Some(current) = stack.pop() {
            if seen[current.0] {
                continue;
            }
            seen[current.0] = true;
            let doc = self.get(current);
            for parent in doc.included_in.iter().chain(&doc.embedded_in) {
                if *parent == ancestor {
                    return true;
                }
                stack.push(*parent);
            }
        }
        false
    }

    /// The owning parent, or the first embedder of an embedded document.
    #[must_use]
    pub fn parent(&self, id: DocId) -> Option<DocId> {
        let doc = self.get(id);
        doc.included_in.or_else(|| doc.embedded_in.first().copied())
    }

    /// Root of the tree containing `id`.
    ///
    /// Follows the owning parent, or the first embedder, until no parent is
    /// left. Every embedder is expected to lead to the same root.
    #[must_use]
    pub fn root(&self, id: DocId) -> DocId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// The nearest document that embeds `id` and is not embedded itself.
    ///
    /// This is the document whose output contains the content of `id`.
    #[must_use]
    pub fn find_embedder(&self, id: DocId) -> DocId {
        let mut current = id;
        while let Some(&embedder) = self.get(current).embedded_in.first() {
            current = embedder;
        }
        current
    }

    /// Whether `id` is embedded in `other`, directly or through other embedders.
    #[must_use]
    pub fn is_embedded_in(&self, id: DocId, other: DocId) -> bool {
        let embedders = &self.get(id).embedded_in;
        embedders.contains(&other) || embedders.iter().any(|&e| self.is_embedded_in(e, other))
    }

    /// Next page in reading order, following inclusion edges only.
    #[must_use]
    pub fn preorder_next(&self, id: DocId) -> Option<DocId> {
        self.included_children(id)
            .next()
            .or_else(|| self.next_subtree(id))
    }

    /// Previous page in reading order, following inclusion edges only.
    #[must_use]
    pub fn preorder_prev(&self, id: DocId) -> Option<DocId> {
        let parent = self.parent(id)?;
        let siblings = &self.get(parent).children;
        let position = siblings.iter().position(|&c| c == id)?;
        siblings[..position]
            .iter()
            .rev()
            .find(|&&c| self.get(c).included_in == Some(parent))
            .map(|&c| self.last_leaf(c))
            .or(Some(parent))
    }

    /// All pages of the tree containing `id`, in reading order.
    #[must_use]
    pub fn iter_all(&self, id: DocId) -> Vec<DocId> {
        let mut result = Vec::new();
        self.collect_subtree(self.root(id), &mut result);
        result
    }

    fn collect_subtree(&self, id: DocId, result: &mut Vec<DocId>) {
        result.push(id);
        let children: Vec<DocId> = self.included_children(id).collect();
        for child in children {
            self.collect_subtree(child, result);
        }
    }

    fn included_children(&self, id: DocId) -> impl Iterator<Item = DocId> + '_ {
        self.get(id)
            .children
            .iter()
            .copied()
            .filter(move |&c| self.get(c).included_in == Some(id))
    }

    fn next_subtree(&self, id: DocId) -> Option<DocId> {
        let parent = self.parent(id)?;
        let siblings = &self.get(parent).children;
        let position = siblings.iter().position(|&c| c == id)?;
        siblings[position + 1..]
            .iter()
            .copied()
            .find(|&c| self.get(c).included_in == Some(parent))
            .or_else(|| self.next_subtree(parent))
    }

    fn last_leaf(&self, id: DocId) -> DocId {
        match self.included_children(id).last() {
            Some(child) => self.last_leaf(child),
            None => id,
        }
    }
}
