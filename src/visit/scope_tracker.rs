//! Block scopes for name resolution.
//!
//! A `ScopeTracker` holds the function-local part of the lexical environment:
//! one frame per block, innermost last. Package, file and universe scopes are
//! looked up by the resolver after the tracker misses.
//!
//! ```rust
//! use refmove::visit::scope_tracker::ScopeTracker;
//!
//! let mut scopes = ScopeTracker::<u32>::new();
//! scopes.push_scope();
//! scopes.declare("x", 1);
//! scopes.push_scope();
//! scopes.declare("x", 2);
//! assert_eq!(scopes.lookup("x"), Some(&2));
//! scopes.pop_scope();
//! assert_eq!(scopes.lookup("x"), Some(&1));
//! ```

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ScopeTracker<T> {
    scopes: Vec<HashMap<String, T>>,
}

impl<T> ScopeTracker<T> {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost frame, returning its bindings.
    pub fn pop_scope(&mut self) -> Option<HashMap<String, T>> {
        self.scopes.pop()
    }

    /// Bind `name` in the innermost frame, opening one if none is active.
    /// Returns the binding it replaced in that same frame, if any.
    pub fn declare(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        if self.scopes.is_empty() {
            self.push_scope();
        }
        let frame = self.scopes.len() - 1;
        self.scopes[frame].insert(name.into(), value)
    }

    /// Innermost binding of `name`, if any frame has one.
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Check if `name` is bound in the innermost frame only.
    pub fn declared_in_current(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|scope| scope.contains_key(name))
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl<T> Default for ScopeTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ==============================================================================
// Tests
// ==============================================================================
