//! String interning for data and operation names
//!
//! Every data-name is stored once and shared as `Arc<str>` across the
//! network tables, compiled plans, result sets and events.
//!
//! - Memory: single allocation per unique name
//! - Cloning: `Arc::clone` is O(1), no string copy
//! - Lookups: `Arc<str>` borrows as `&str`, so maps can be queried with plain strings

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

/// Global name interner (thread-safe, sharded)
static INTERNER: Lazy<Interner> = Lazy::new(Interner::new);

/// Thread-safe string interner using DashMap
pub struct Interner {
    strings: DashMap<Arc<str>, ()>,
}

impl Interner {
    pub fn new() -> Self {
        Self {
            strings: DashMap::new(),
        }
    }

    /// Intern a string, returning a shared `Arc<str>`
    ///
    /// Concurrent callers interning the same string always get the same Arc.
    pub fn intern(&self, s: &str) -> Arc<str> {
        // Fast path: no allocation when already interned
        if let Some(existing) = self.strings.get(s) {
            return Arc::clone(existing.key());
        }

        let entry = self.strings.entry(Arc::from(s)).or_insert(());
        Arc::clone(entry.key())
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

/// Intern a name using the global interner
#[inline]
pub fn intern(s: &str) -> Arc<str> {
    INTERNER.intern(s)
}
