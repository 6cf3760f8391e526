//! Cross-reference engine for xd.
//!
//! Processes a tree of AsciiDoc documents that embed commands such as
//! `::insert[log::Logger]` or `:link[log::Level]`. Commands pull API
//! reference content into the documents and link to it across pages.
//!
//! Processing runs in two passes over the same documents (see [`Processor`]):
//! discovery builds the document tree and the registries of inserted
//! elements, links and anchors; generation produces the final text once every
//! link target is known.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use xd_document::Package;
//! use xd_engine::{PackageManager, Processor, ProcessorConfig, TemplateSet};
//! use xd_reference::ApiReference;
//!
//! let packages = PackageManager::new(Package::input("docs", "index.adoc"));
//! let root = packages.input_root().unwrap();
//! let processor = Processor::new(
//!     ProcessorConfig::default(),
//!     Arc::new(ApiReference::new()),
//!     Arc::new(packages),
//!     Arc::new(TemplateSet::builtin()),
//! );
//! let output = processor.run(&root).unwrap();
//! for page in &output.pages {
//!     println!("{}: {} bytes", page.file, page.text.len());
//! }
//! ```

mod api;
mod cache;
mod command;
mod context;
pub mod directive;
mod error;
mod filter;
mod links;
mod navigation;
mod packages;
mod processor;
mod render;
mod resolver;
mod trace;
mod version;

pub use cache::DocumentCache;
pub use error::{ConsistencyError, EngineError};
pub use filter::{FilterSpec, InsertionFilter, RuleList};
pub use packages::{PackageError, PackageManager, PackageProvider, ResolvedFile};
pub use processor::{
    AnchorRecord, InsertedElement, OutputPage, ProcessOutput, Processor, ProcessorConfig,
    ResolvedReferences,
};
pub use render::{RenderRequest, RenderScope, TemplateRenderer, TemplateSet};
pub use trace::{StackFrame, Trace};
pub use version::{VERSION, check_version};
