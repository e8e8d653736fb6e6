//! Utilities Module - shared infrastructure
//!
//! - `interner`: name interning (`Arc<str>` deduplication)

mod interner;

pub use interner::{intern, Interner};
