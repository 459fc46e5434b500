// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth-keyed work items and the two orderings built on them.
//!
//! A [`WorkItem`] pairs a view with its depth at the moment the item was
//! pulled from a pending set. Depth is never cached across phases because
//! the tree may change in between.
//!
//! Items are totally ordered by depth, then by [`ViewId`] as a stable
//! tie-break. Sizing consumes items child-first (deepest first); layout
//! consumes them parent-first (shallowest first).

use core::cmp::Ordering;

use crate::tree::ViewTree;
use crate::view::ViewId;

/// A view paired with its tree depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkItem {
    /// The view to update.
    pub view: ViewId,
    /// Ancestor hops to the root, computed when the item was created.
    pub depth: usize,
}

impl WorkItem {
    /// Computes the depth of `view` in `tree` and pairs them.
    #[must_use]
    pub fn new(tree: &dyn ViewTree, view: ViewId) -> Self {
        Self {
            view,
            depth: tree.depth(view),
        }
    }
}

impl Ord for WorkItem {
    /// Parent-first: shallower items sort before deeper ones.
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth
            .cmp(&other.depth)
            .then_with(|| self.view.cmp(&other.view))
    }
}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Undone sizing work for one phase, consumed child-first.
///
/// New handles are merged in as they are swapped out of the pending set. A
/// handle that is merged again replaces its earlier entry (with a freshly
/// computed depth), so no view is ever queued twice.
#[derive(Clone, Debug, Default)]
pub struct ChildFirstQueue {
    // Sorted parent-first so the deepest item pops off the end.
    items: Vec<WorkItem>,
}

impl ChildFirstQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges freshly requested views, recomputing every new item's depth.
    pub fn merge(&mut self, tree: &dyn ViewTree, fresh: impl IntoIterator<Item = ViewId>) {
        let fresh: Vec<WorkItem> = fresh.into_iter().map(|v| WorkItem::new(tree, v)).collect();
        if fresh.is_empty() {
            return;
        }
        self.items
            .retain(|old| !fresh.iter().any(|new| new.view == old.view));
        self.items.extend(fresh);
        self.items.sort_unstable();
        self.items.dedup_by_key(|item| item.view);
    }

    /// Removes and returns the deepest item.
    pub fn pop(&mut self) -> Option<WorkItem> {
        self.items.pop()
    }

    /// Number of undone items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether no undone items remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Picks the shallowest of `candidates`, computing each depth fresh.
#[must_use]
pub fn shallowest(tree: &dyn ViewTree, candidates: &[ViewId]) -> Option<WorkItem> {
    candidates.iter().map(|&v| WorkItem::new(tree, v)).min()
}

/// Builds parent-first ordered items for every candidate.
#[must_use]
pub fn parent_first(tree: &dyn ViewTree, candidates: &[ViewId]) -> Vec<WorkItem> {
    let mut items: Vec<WorkItem> = candidates.iter().map(|&v| WorkItem::new(tree, v)).collect();
    items.sort_unstable();
    items
}
