//! Documents and the packages they come from.

use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::title::extract_title;

/// Name of the implicit package holding the input file and its siblings.
pub const INPUT_PACKAGE: &str = "INPUT";

/// Identifier of a document inside a [`DocumentTree`](crate::DocumentTree).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocId(pub(crate) usize);

impl DocId {
    /// Position of the document in its tree.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named source of documents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Package {
    pub name: String,
    /// Directory containing the package's documents.
    pub src_dir: Option<PathBuf>,
    /// Directory containing images referenced by the documents.
    pub image_dir: Option<PathBuf>,
    /// Document used when the package is referenced without a file name.
    pub root_doc: Option<String>,
}

impl Package {
    /// Create the implicit input package.
    pub fn input(src_dir: impl Into<PathBuf>, root_doc: impl Into<String>) -> Self {
        Self {
            name: INPUT_PACKAGE.to_owned(),
            src_dir: Some(src_dir.into()),
            image_dir: None,
            root_doc: Some(root_doc.into()),
        }
    }

    #[must_use]
    pub fn is_input(&self) -> bool {
        self.name == INPUT_PACKAGE
    }
}

/// One input file instance in the output tree.
#[derive(Debug)]
pub struct Document {
    relative_path: String,
    package: String,
    source: PathBuf,
    pub(crate) is_root: bool,
    pub(crate) children: Vec<DocId>,
    pub(crate) included_in: Option<DocId>,
    pub(crate) embedded_in: Vec<DocId>,
    title: OnceCell<String>,
}

impl Document {
    pub(crate) fn new(package: &str, relative_path: &str, source: PathBuf) -> Self {
        Self {
            relative_path: relative_path.to_owned(),
            package: package.to_owned(),
            source,
            is_root: false,
            children: Vec::new(),
            included_in: None,
            embedded_in: Vec::new(),
            title: OnceCell::new(),
        }
    }

    /// Posix-style path of the document inside its package.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Absolute path of the original file.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Included and embedded children, in the order they were attached.
    #[must_use]
    pub fn children(&self) -> &[DocId] {
        &self.children
    }

    #[must_use]
    pub fn included_in(&self) -> Option<DocId> {
        self.included_in
    }

    #[must_use]
    pub fn embedded_in(&self) -> &[DocId] {
        &self.embedded_in
    }

    #[must_use]
    pub fn is_included(&self) -> bool {
        self.included_in.is_some()
    }

    #[must_use]
    pub fn is_embedded(&self) -> bool {
        !self.embedded_in.is_empty()
    }

    /// A document is used when it is the root or has at least one parent.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.is_root || self.is_included() || self.is_embedded()
    }

    /// File name without extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        let name = self
            .relative_path
            .rsplit_once('/')
            .map_or(self.relative_path.as_str(), |(_, name)| name);
        name.rsplit_once('.').map_or(name, |(stem, _)| stem)
    }

    /// Extension of the file name, including the leading dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        let name = self
            .relative_path
            .rsplit_once('/')
            .map_or(self.relative_path.as_str(), |(_, name)| name);
        name.rfind('.').map_or("", |i| &name[i..])
    }

    /// Set the title from the document's source text.
    ///
    /// Only the first call has an effect. Returns the title in use.
    pub fn load_title(&self, text: &str) -> &str {
        self.title.get_or_init(|| {
            extract_title(text).unwrap_or_else(|| {
                tracing::warn!(document = %self, "Did not find title in document");
                self.stem().to_owned()
            })
        })
    }

    /// Title from the first level 0 heading, or the file stem while the
    /// source has not been loaded.
    pub fn title(&self) -> &str {
        self.title.get().map_or_else(|| self.stem(), String::as_str)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package == INPUT_PACKAGE {
            f.write_str(&self.relative_path)
        } else {
            write!(f, "[{}]:/{}", self.package, self.relative_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_input_package() {
        let doc = Document::new(INPUT_PACKAGE, "a/b.adoc", PathBuf::from("/src/a/b.adoc"));
        assert_eq!(doc.to_string(), "a/b.adoc");
    }

    #[test]
    fn test_display_named_package() {
        let doc = Document::new("lib", "index.adoc", PathBuf::from("/lib/index.adoc"));
        assert_eq!(doc.to_string(), "[lib]:/index.adoc");
    }

    #[test]
    fn test_stem_and_extension() {
        let doc = Document::new(INPUT_PACKAGE, "dir/file.name.adoc", PathBuf::new());
        assert_eq!(doc.stem(), "file.name");
        assert_eq!(doc.extension(), ".adoc");

        let doc = Document::new(INPUT_PACKAGE, "README", PathBuf::new());
        assert_eq!(doc.stem(), "README");
        assert_eq!(doc.extension(), "");
    }

    #[test]
    fn test_title_from_heading() {
        let doc = Document::new(INPUT_PACKAGE, "guide.adoc", PathBuf::new());
        let title = doc.load_title(":toc:\n\n= The *Best* Guide\n\n== Section\n");
        assert_eq!(title, "The Best Guide");
        assert_eq!(doc.title(), "The Best Guide");
    }

    #[test]
    fn test_title_falls_back_to_stem() {
        let doc = Document::new(INPUT_PACKAGE, "dir/notes.adoc", PathBuf::new());
        assert_eq!(doc.load_title("== Only a section\n"), "notes");
    }

    #[test]
    fn test_title_before_load_is_stem() {
        let doc = Document::new(INPUT_PACKAGE, "gone.adoc", PathBuf::new());
        assert_eq!(doc.title(), "gone");
    }

    #[test]
    fn test_title_is_loaded_once() {
        let doc = Document::new(INPUT_PACKAGE, "a.adoc", PathBuf::new());
        doc.load_title("= First\n");
        assert_eq!(doc.load_title("= Second\n"), "First");
        assert_eq!(doc.title(), "First");
    }

    #[test]
    fn test_is_used() {
        let mut doc = Document::new(INPUT_PACKAGE, "a.adoc", PathBuf::new());
        assert!(!doc.is_used());
        doc.is_root = true;
        assert!(doc.is_used());
    }
}
