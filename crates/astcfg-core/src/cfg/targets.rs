//! Jump target stacks for `break`, `continue` and `throw`.
//!
//! Entries are pushed when the builder enters a construct that can be jumped
//! to and popped when it leaves, so the stack always mirrors AST nesting.

use super::block::{BlockKind, BlockRef};

/// One enclosing jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target<'a> {
    pub block: BlockRef,
    /// Kind of `block` at push time; merge kinds never change afterwards.
    pub kind: BlockKind,
    pub label: Option<&'a str>,
}

/// How an unlabeled jump picks its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPolicy {
    /// Nearest entry, whatever it is (break, throw).
    Innermost,
    /// Nearest entry that is not a `Join2` scope marker (continue).
    SkipScopeMarkers,
}

/// A LIFO stack of jump targets.
#[derive(Debug, Default)]
pub struct TargetStack<'a> {
    entries: Vec<Target<'a>>,
}

impl<'a> TargetStack<'a> {
    pub fn new() -> Self {
        TargetStack {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, block: BlockRef, kind: BlockKind, label: Option<&'a str>) {
        self.entries.push(Target { block, kind, label });
    }

    pub fn pop(&mut self) -> Option<Target<'a>> {
        self.entries.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the block a jump transfers to.
    ///
    /// Unlabeled jumps take the innermost entry allowed by `policy`. Labeled
    /// jumps take the innermost entry carrying that label. Under
    /// `SkipScopeMarkers`, a label found on a `Join2` marker (a labeled block
    /// wrapping a loop) resolves to the first loop entered inside that block.
    pub fn resolve(&self, label: Option<&str>, policy: LookupPolicy) -> Option<BlockRef> {
        let Some(label) = label else {
            return self
                .entries
                .iter()
                .rev()
                .find(|target| policy.accepts(target))
                .map(|target| target.block);
        };

        let position = self
            .entries
            .iter()
            .rposition(|target| target.label == Some(label))?;
        let found = &self.entries[position];
        if policy.accepts(found) {
            return Some(found.block);
        }
        self.entries[position + 1..]
            .iter()
            .find(|target| policy.accepts(target))
            .map(|target| target.block)
    }
}

impl LookupPolicy {
    fn accepts(self, target: &Target<'_>) -> bool {
        match self {
            LookupPolicy::Innermost => true,
            LookupPolicy::SkipScopeMarkers => target.kind != BlockKind::Join2,
        }
    }
}
