//! API reference database for xd.
//!
//! Holds the symbols documents refer to and answers lookups by name, kind and
//! language. Symbols are loaded from JSON reference files produced by an
//! external extraction step.
//!
//! # Example
//!
//! ```
//! use xd_reference::{ApiReference, Query, ReferenceDatabase};
//!
//! let mut reference = ApiReference::new();
//! reference
//!     .load_json(r#"{"elements": [{"id": "cpp-logger", "name": "Logger",
//!         "full_name": "log::Logger", "language": "cpp", "kind": "class"}]}"#)
//!     .unwrap();
//!
//! let element = reference.find(&Query::new("log::Logger")).unwrap().unwrap();
//! assert_eq!(element.id.as_deref(), Some("cpp-logger"));
//! ```

mod database;
mod element;
mod language;
mod query;
mod transcode;

pub use database::{AmbiguousLookup, ApiReference, Query, ReferenceDatabase, ReferenceError};
pub use element::{Parameter, ReferableElement, ThrowsClause, TypeRef};
pub use language::safe_language_tag;
pub use transcode::{Transcoder, transcoder};
