//! Command syntax embedded in documents.
//!
//! # Syntax
//!
//! - **Inline**: `:name[content]{attrs}` is replaced in place
//! - **Leaf**: `::name[content]{attrs}` normally fills a whole line; the line
//!   disappears when the command produces no output
//!
//! Attributes are `key=value`, `key="quoted value"` or `.flag`. Directives
//! inside listing blocks are left alone, as are names that no handler claims.

mod args;
mod expand;
mod fence;
mod parser;

pub use args::DirectiveArgs;
pub use expand::expand;
pub use parser::ParsedDirective;
