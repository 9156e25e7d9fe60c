//! String interning: every qualified type and field name that passes
//! through the descriptor loader is deduplicated into a single shared
//! allocation, so a [`DescriptorPool`](super::pool::DescriptorPool) holding
//! thousands of field names pays for each distinct string once.
//!
//! The canonical design reaches for a Brent-variant open-addressing hash
//! table with its own bucket array; in Rust `std::collections::HashMap`
//! already gives the same amortized O(1) behavior without hand-rolling
//! probe sequences, so the interner is just a thin wrapper around one.

use std::collections::HashMap;
use std::sync::Arc;

/// Deduplicates strings into `Arc<str>` handles. Cloning a handle is a
/// refcount bump; two calls to [`Interner::intern`] with equal contents
/// return pointer-identical `Arc`s.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    table: HashMap<Arc<str>, ()>,
}

impl Interner {
    pub fn new() -> Self {
        Interner {
            table: HashMap::new(),
        }
    }

    /// Returns the shared handle for `value`, inserting a new one if this
    /// exact string has not been seen before.
    pub fn intern(&mut self, value: &str) -> Arc<str> {
        if let Some((key, _)) = self.table.get_key_value(value) {
            return key.clone();
        }
        let arc: Arc<str> = Arc::from(value);
        self.table.insert(arc.clone(), ());
        arc
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_interns_share_allocation() {
        let mut interner = Interner::new();
        let a = interner.intern("google.protobuf.Duration");
        let b = interner.intern("google.protobuf.Duration");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn distinct_strings_stay_distinct() {
        let mut interner = Interner::new();
        let a = interner.intern("Foo");
        let b = interner.intern("Bar");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 2);
    }
}
