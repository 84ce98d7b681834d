// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One-to-one association between handles of two object graphs.

use rustc_hash::FxHashMap;

use crate::handle::Handle;

/// Bidirectional handle map. Each side appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandleMapping {
    forward: FxHashMap<Handle, Handle>,
    backward: FxHashMap<Handle, Handle>,
}

impl HandleMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `from -> to`.
    ///
    /// Returns `false` and leaves the mapping unchanged if either handle is
    /// already mapped to something else.
    pub fn insert(&mut self, from: Handle, to: Handle) -> bool {
        match (self.forward.get(&from), self.backward.get(&to)) {
            (Some(existing), _) if *existing != to => false,
            (_, Some(existing)) if *existing != from => false,
            _ => {
                self.forward.insert(from, to);
                self.backward.insert(to, from);
                true
            }
        }
    }

    /// Records `from -> to`, dropping any previous association of either side.
    pub fn replace(&mut self, from: Handle, to: Handle) {
        if let Some(old_to) = self.forward.remove(&from) {
            self.backward.remove(&old_to);
        }
        if let Some(old_from) = self.backward.remove(&to) {
            self.forward.remove(&old_from);
        }
        self.forward.insert(from, to);
        self.backward.insert(to, from);
    }

    pub fn get(&self, from: &Handle) -> Option<Handle> {
        self.forward.get(from).copied()
    }

    pub fn get_reverse(&self, to: &Handle) -> Option<Handle> {
        self.backward.get(to).copied()
    }

    pub fn contains(&self, from: &Handle) -> bool {
        self.forward.contains_key(from)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Pairs sorted by source handle.
    pub fn pairs(&self) -> Vec<(Handle, Handle)> {
        let mut pairs: Vec<_> = self.forward.iter().map(|(a, b)| (*a, *b)).collect();
        pairs.sort_unstable();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_one_to_one() {
        let (a, b, c) = (Handle::new(), Handle::new(), Handle::new());
        let mut mapping = HandleMapping::new();
        assert!(mapping.insert(a, b));
        assert!(mapping.insert(a, b));
        assert!(!mapping.insert(a, c));
        assert!(!mapping.insert(c, b));
        assert_eq!(mapping.get(&a), Some(b));
        assert_eq!(mapping.get_reverse(&b), Some(a));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn replace_drops_stale_pairs() {
        let (a, b, c) = (Handle::new(), Handle::new(), Handle::new());
        let mut mapping = HandleMapping::new();
        mapping.insert(a, b);
        mapping.replace(c, b);
        assert_eq!(mapping.get(&a), None);
        assert_eq!(mapping.get(&c), Some(b));
        assert_eq!(mapping.get_reverse(&b), Some(c));
        assert_eq!(mapping.pairs().len(), 1);
    }
}
