//! Document graph for xd.
//!
//! Models every input file that takes part in a processing run together with
//! the relationships between them:
//!
//! - **Inclusion**: a child has exactly one owning parent and becomes a page of
//!   its own in multi-page output. Inclusion edges form a tree.
//! - **Embedding**: the child's content is folded into the embedding parent.
//!   A document may be embedded from many parents.
//!
//! Documents live in a flat arena ([`DocumentTree`]) and refer to each other by
//! [`DocId`], so the back-references from children to parents never form
//! ownership cycles.

mod document;
mod path;
mod title;
mod tree;

pub use document::{DocId, Document, INPUT_PACKAGE, Package};
pub use path::{relative_path, resolve_relative, top_anchor};
pub use title::extract_title;
pub use tree::{DocumentTree, GraphError};
