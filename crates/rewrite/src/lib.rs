//! Streaming document rewriting: cache extension and script minification.
//!
//! The [`ResourceManager`] owns the shared machinery (fetching, hashing,
//! the content store, the serving surface); [`filter`] holds the per-document
//! state machines that consume parse events and rewrite references. Filters
//! degrade per reference and never fail a document over one bad resource.

pub mod error;
mod events;
pub mod filter;
mod hasher;
mod manager;
mod resource;
pub mod testing;
mod transform;

pub use events::{Attribute, DocumentEvent, Element, render};
pub use filter::cache_extender::{CACHE_EXTEND_FILTER_ID, CacheDecision, CacheExtender};
pub use filter::script::{SCRIPT_REWRITE_FILTER_ID, ScriptRewriteFilter};
pub use filter::{DocumentFilter, Filter, drive};
pub use hasher::{Blake3Hasher, ContentHasher, StubHasher};
pub use manager::ResourceManager;
pub use resource::{FetchStatus, InputResource, OutputResource, ServedResource};
pub use transform::{ContentTransform, IdentityTransform};
