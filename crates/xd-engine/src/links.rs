//! Link targets and relative paths between output files.
//!
//! # Page modes
//!
//! In single-page mode every document ends up in the output of the root
//! document, so paths are computed from the root's output file. A target
//! embedded into an ancestor of the link site resolves to that ancestor.
//!
//! In multi-page mode every root or included document is a page of its own
//! and embedded content lives in the page of its embedder. A target embedded
//! into the page containing the link resolves to that page, anything else to
//! the page of its first embedder.

use xd_document::{DocId, DocumentTree, relative_path};

use crate::ConsistencyError;
use crate::context::{Context, Phase};

/// Output file of a document.
pub(crate) fn output_file(tree: &DocumentTree, id: DocId) -> &str {
    tree.get(id).relative_path()
}

/// Document whose output holds `target` when linked from `from` in
/// single-page mode.
pub(crate) fn single_page_target(
    tree: &DocumentTree,
    from: DocId,
    target: DocId,
) -> Result<DocId, ConsistencyError> {
    let candidates: Vec<DocId> = ancestors(tree, from)
        .into_iter()
        .filter(|&ancestor| tree.is_embedded_in(target, ancestor))
        .collect();

    let Some(&nearest) = candidates.first() else {
        return Ok(tree.find_embedder(target));
    };
    let unrelated: Vec<DocId> = candidates[1..]
        .iter()
        .copied()
        .filter(|&other| !tree.is_ancestor(other, nearest))
        .collect();
    if unrelated.is_empty() {
        return Ok(nearest);
    }

    Err(ConsistencyError::DivergentEmbedding {
        document: tree.get(target).to_string(),
        candidates: std::iter::once(nearest)
            .chain(unrelated)
            .map(|id| tree.get(id).to_string())
            .collect(),
    })
}

/// Page holding `target` when linked from `page` in multi-page mode.
pub(crate) fn multipage_target(tree: &DocumentTree, page: DocId, target: DocId) -> DocId {
    if target == page || tree.is_embedded_in(target, page) {
        page
    } else {
        tree.find_embedder(target)
    }
}

/// `id` and every document reachable over parent edges, nearest first.
fn ancestors(tree: &DocumentTree, id: DocId) -> Vec<DocId> {
    let mut result = vec![id];
    let mut next = 0;
    while next < result.len() {
        let doc = tree.get(result[next]);
        for &parent in doc.included_in().iter().chain(doc.embedded_in()) {
            if !result.contains(&parent) {
                result.push(parent);
            }
        }
        next += 1;
    }
    result
}

impl Context<'_> {
    /// File of the page this context writes to.
    pub(crate) fn page_file(&self) -> &str {
        output_file(&self.run.tree, self.page)
    }

    /// Relative path from the current output to the output holding `target`.
    pub(crate) fn link_path(&self, target: DocId) -> Result<String, ConsistencyError> {
        let tree = &self.run.tree;
        if self.scope.multipage {
            let target_page = multipage_target(tree, self.page, target);
            Ok(relative_path(
                self.page_file(),
                output_file(tree, target_page),
            ))
        } else {
            let target_doc = single_page_target(tree, self.document, target)?;
            let root = tree.root(self.document);
            Ok(relative_path(
                output_file(tree, root),
                output_file(tree, target_doc),
            ))
        }
    }

    /// Markup for a link to an element.
    ///
    /// During discovery the link is only recorded. Links to elements that
    /// are not inserted anywhere render as plain text; they are reported
    /// once the run completes.
    pub(crate) fn element_link(&mut self, id: &str, text: &str) -> String {
        if self.run.phase == Phase::Discovering {
            self.link_to_element(id);
            return String::new();
        }

        let Some(insertion) = self.run.inserted.get(id) else {
            return text.to_owned();
        };
        let file_part = if self.scope.multipage {
            let tree = &self.run.tree;
            let target_page = multipage_target(tree, self.page, insertion.document);
            if target_page == self.page {
                String::new()
            } else {
                format!(
                    "{}#",
                    relative_path(self.page_file(), output_file(tree, target_page))
                )
            }
        } else {
            String::new()
        };
        format!("xref:{file_part}{id}[++{text}++]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::context::tests::services;
    use crate::context::{RunState, Scope};

    fn add(tree: &mut DocumentTree, path: &str) -> DocId {
        tree.add("INPUT", path, path.into())
    }

    #[test]
    fn test_single_page_path_is_relative_to_root_output() {
        let mut run = RunState::new();
        let root = run.tree.add_root("INPUT", "index.adoc", "index.adoc".into());
        let index = add(&mut run.tree, "a/index.adoc");
        let other = add(&mut run.tree, "a/b/other.adoc");
        run.tree.include(root, index).unwrap();
        run.tree.include(index, other).unwrap();
        let services = services();

        let ctx = Context::new(&mut run, &services, Scope::default(), index);
        assert_eq!(ctx.link_path(other).unwrap(), "a/b/other.adoc");
    }

    #[test]
    fn test_single_page_target_embedded_in_ancestor() {
        let mut tree = DocumentTree::new();
        let root = tree.add_root("INPUT", "index.adoc", "index.adoc".into());
        let chapter = add(&mut tree, "chapter.adoc");
        let shared = add(&mut tree, "shared.adoc");
        tree.include(root, chapter).unwrap();
        tree.embed(root, shared).unwrap();

        assert_eq!(single_page_target(&tree, chapter, shared), Ok(root));
        assert_eq!(single_page_target(&tree, root, chapter), Ok(chapter));
    }

    #[test]
    fn test_single_page_nearest_embedding_ancestor_wins() {
        let mut tree = DocumentTree::new();
        let root = tree.add_root("INPUT", "index.adoc", "index.adoc".into());
        let chapter = add(&mut tree, "chapter.adoc");
        let section = add(&mut tree, "section.adoc");
        let shared = add(&mut tree, "shared.adoc");
        tree.include(root, chapter).unwrap();
        tree.include(chapter, section).unwrap();
        tree.embed(root, shared).unwrap();
        tree.embed(chapter, shared).unwrap();

        assert_eq!(single_page_target(&tree, section, shared), Ok(chapter));
    }

    #[test]
    fn test_single_page_divergent_embedding() {
        let mut tree = DocumentTree::new();
        let root = tree.add_root("INPUT", "index.adoc", "index.adoc".into());
        let left = add(&mut tree, "left.adoc");
        let right = add(&mut tree, "right.adoc");
        let inner = add(&mut tree, "inner.adoc");
        let shared = add(&mut tree, "shared.adoc");
        tree.include(root, left).unwrap();
        tree.include(root, right).unwrap();
        tree.embed(left, inner).unwrap();
        tree.embed(right, inner).unwrap();
        tree.embed(left, shared).unwrap();
        tree.embed(right, shared).unwrap();

        let err = single_page_target(&tree, inner, shared).unwrap_err();
        assert_eq!(
            err,
            ConsistencyError::DivergentEmbedding {
                document: "shared.adoc".to_owned(),
                candidates: vec!["left.adoc".to_owned(), "right.adoc".to_owned()],
            }
        );
    }

    #[test]
    fn test_multipage_embedded_target_resolves_per_page() {
        let mut tree = DocumentTree::new();
        let root = tree.add_root("INPUT", "index.adoc", "index.adoc".into());
        let child = add(&mut tree, "child.adoc");
        let child2 = add(&mut tree, "c/child2.adoc");
        tree.embed(root, child).unwrap();
        tree.include(root, child2).unwrap();
        tree.embed(child2, child).unwrap();

        assert_eq!(multipage_target(&tree, root, child), root);
        assert_eq!(multipage_target(&tree, child2, child), child2);
        assert_eq!(multipage_target(&tree, child2, root), root);
    }

    #[test]
    fn test_multipage_link_path() {
        let mut run = RunState::new();
        let root = run.tree.add_root("INPUT", "index.adoc", "index.adoc".into());
        let child = add(&mut run.tree, "child.adoc");
        let child2 = add(&mut run.tree, "c/child2.adoc");
        run.tree.embed(root, child).unwrap();
        run.tree.include(root, child2).unwrap();
        run.tree.embed(child2, child).unwrap();
        let services = services();
        let scope = Scope {
            multipage: true,
            ..Scope::default()
        };

        let from_root = Context::new(&mut run, &services, scope.clone(), root);
        assert_eq!(from_root.link_path(child).unwrap(), "index.adoc");
        assert_eq!(from_root.link_path(child2).unwrap(), "c/child2.adoc");

        let from_child2 = Context::new(&mut run, &services, scope, child2);
        assert_eq!(from_child2.link_path(child).unwrap(), "child2.adoc");
        assert_eq!(from_child2.link_path(root).unwrap(), "../index.adoc");
    }

    #[test]
    fn test_element_link_in_generation() {
        let mut run = RunState::new();
        let root = run.tree.add_root("INPUT", "index.adoc", "index.adoc".into());
        let page = add(&mut run.tree, "api/logger.adoc");
        run.tree.include(root, page).unwrap();
        let services = services();
        let scope = Scope {
            multipage: true,
            ..Scope::default()
        };

        let mut ctx = Context::new(&mut run, &services, scope.clone(), page);
        ctx.line = 2;
        ctx.insert(&xd_reference::ReferableElement {
            id: Some("cpp-logger".to_owned()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ctx.element_link("cpp-logger", "Logger"), "");
        assert!(ctx.run.linked.contains_key("cpp-logger"));

        ctx.run.phase = Phase::Generating;
        assert_eq!(
            ctx.element_link("cpp-logger", "Logger"),
            "xref:cpp-logger[++Logger++]"
        );
        assert_eq!(ctx.element_link("cpp-other", "Other"), "Other");

        let mut from_root = Context::new(&mut run, &services, scope, root);
        assert_eq!(
            from_root.element_link("cpp-logger", "Logger"),
            "xref:api/logger.adoc#cpp-logger[++Logger++]"
        );
    }
}
