//! Reference database contract and the in-memory implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::ReferableElement;
use crate::query::{NameFilter, ParameterTypeMatcher, short_name};

/// Error loading reference files.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("Failed to read reference file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid reference file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// More than one element matches a lookup.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} elements match the lookup", .candidates.len())]
pub struct AmbiguousLookup {
    pub candidates: Vec<Arc<ReferableElement>>,
}

/// Parameters of a lookup by name.
#[derive(Clone, Copy, Debug, Default)]
pub struct Query<'a> {
    /// Name, optionally qualified and optionally followed by parameter types.
    pub name: &'a str,
    /// Namespace to start searching from.
    pub namespace: Option<&'a str>,
    pub kind: Option<&'a str>,
    pub language: Option<&'a str>,
    /// Return the first element of an overload set instead of failing.
    pub allow_overloads: bool,
}

impl<'a> Query<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }
}

/// Source of symbols for inserting and linking.
pub trait ReferenceDatabase: Send + Sync {
    /// Find a single element by name.
    ///
    /// Returns `Ok(None)` when nothing matches and [`AmbiguousLookup`] when
    /// several elements match and cannot be told apart.
    fn find(&self, query: &Query<'_>) -> Result<Option<Arc<ReferableElement>>, AmbiguousLookup>;

    /// Find an element by its id.
    fn find_by_id(&self, id: &str) -> Option<Arc<ReferableElement>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReferenceFile {
    Wrapped { elements: Vec<ReferableElement> },
    Bare(Vec<ReferableElement>),
}

/// In-memory reference database indexed by id and short name.
#[derive(Debug, Default)]
pub struct ApiReference {
    elements: Vec<Arc<ReferableElement>>,
    id_index: HashMap<String, Arc<ReferableElement>>,
    name_index: HashMap<String, Vec<Arc<ReferableElement>>>,
}

impl ApiReference {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements, including nested members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Add an element and all of its members.
    pub fn append(&mut self, element: ReferableElement) {
        for member in &element.members {
            self.append(member.clone());
        }

        let element = Arc::new(element);
        if let Some(id) = &element.id {
            if self.id_index.contains_key(id) {
                tracing::debug!(id = %id, "Duplicate element id, keeping first");
            } else {
                self.id_index.insert(id.clone(), Arc::clone(&element));
            }
        }
        self.name_index
            .entry(element.name.clone())
            .or_default()
            .push(Arc::clone(&element));
        self.elements.push(element);
    }

    /// Load elements from JSON text.
    ///
    /// Accepts either `{"elements": [...]}` or a bare array. Returns the
    /// number of top-level elements loaded.
    pub fn load_json(&mut self, text: &str) -> Result<usize, serde_json::Error> {
        let elements = match serde_json::from_str(text)? {
            ReferenceFile::Wrapped { elements } | ReferenceFile::Bare(elements) => elements,
        };
        let count = elements.len();
        for element in elements {
            self.append(element);
        }
        Ok(count)
    }

    /// Load elements from a JSON reference file.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ReferenceError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
            path: path.to_owned(),
            source,
        })?;
        let count = self
            .load_json(&text)
            .map_err(|source| ReferenceError::Parse {
                path: path.to_owned(),
                source,
            })?;
        tracing::debug!(path = %path.display(), count, "Loaded reference file");
        Ok(count)
    }
}

impl ReferenceDatabase for ApiReference {
    fn find(&self, query: &Query<'_>) -> Result<Option<Arc<ReferableElement>>, AmbiguousLookup> {
        let params = ParameterTypeMatcher::parse(query.name);
        let name = params.name.as_str();

        let Some(potential) = self.name_index.get(short_name(name)) else {
            return Ok(None);
        };

        let name_filter = NameFilter::new(name, query.namespace);
        let matches: Vec<&Arc<ReferableElement>> = potential
            .iter()
            .filter(|e| name_filter.matches(e))
            .filter(|e| query.kind.is_none_or(|kind| e.kind == kind))
            .filter(|e| query.language.is_none_or(|lang| e.language == lang))
            .filter(|e| params.matches(e))
            .collect();

        match matches.as_slice() {
            [] => return Ok(None),
            [single] => return Ok(Some(Arc::clone(single))),
            _ => {}
        }

        if let Some(namespace) = query.namespace {
            let exact = NameFilter::exact(name, namespace);
            if let [single] = only(&matches, |e| exact.matches(e)).as_slice() {
                return Ok(Some(Arc::clone(single)));
            }
            let global = NameFilter::new(name, None);
            if let [single] = only(&matches, |e| global.matches(e)).as_slice() {
                return Ok(Some(Arc::clone(single)));
            }
        }

        let first = matches[0];
        if query.allow_overloads
            && matches.iter().all(|e| {
                e.full_name == first.full_name && e.kind == first.kind && e.language == first.language
            })
        {
            return Ok(Some(Arc::clone(first)));
        }

        Err(AmbiguousLookup {
            candidates: matches.into_iter().cloned().collect(),
        })
    }

    fn find_by_id(&self, id: &str) -> Option<Arc<ReferableElement>> {
        self.id_index.get(id).cloned()
    }
}

fn only<'e>(
    matches: &[&'e Arc<ReferableElement>],
    predicate: impl Fn(&ReferableElement) -> bool,
) -> Vec<&'e Arc<ReferableElement>> {
    matches.iter().copied().filter(|e| predicate(&***e)).collect()
}
