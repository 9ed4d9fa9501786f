//! Tracks names bound by block params while walking a template.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

/// A stack of binding frames, one per enclosing block.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    frames: Vec<FxHashSet<SmolStr>>,
}

impl ScopeTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a block binding `names`.
    pub fn push<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.frames.push(names.into_iter().map(Into::into).collect());
    }

    /// Leaves the innermost block.
    ///
    /// # Panics
    ///
    /// Panics if no block is open.
    pub fn pop(&mut self) {
        assert!(
            self.frames.pop().is_some(),
            "scope popped more times than it was pushed"
        );
    }

    /// Returns true if any enclosing block binds `name`.
    pub fn has_binding(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains(name))
    }

    /// Number of open blocks.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_follow_blocks() {
        let mut scope = ScopeTracker::new();
        assert!(!scope.has_binding("item"));

        scope.push(["item", "index"]);
        scope.push(["inner"]);
        assert!(scope.has_binding("item"));
        assert!(scope.has_binding("inner"));

        scope.pop();
        assert!(!scope.has_binding("inner"));
        assert!(scope.has_binding("index"));

        scope.pop();
        assert_eq!(scope.depth(), 0);
        assert!(!scope.has_binding("item"));
    }

    #[test]
    #[should_panic(expected = "scope popped more times than it was pushed")]
    fn test_unbalanced_pop_panics() {
        ScopeTracker::new().pop();
    }
}
