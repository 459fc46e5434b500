// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pending request registry.
//!
//! Four deduplicating sets of view handles, one per [`RequestKind`]. A handle
//! appears at most once per kind at any instant; re-inserting a pending
//! handle is a no-op. Entries leave a set only when the coordinator consumes
//! them.
//!
//! The registry itself is plain data. The coordinator keeps it behind its
//! mutex together with the `update_scheduled` flag.

use core::fmt;

use indexmap::IndexSet;

use crate::view::ViewId;

/// Which operation a pending request is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Recompute preferred-size data.
    Sizing,
    /// Position and size direct children.
    Layout,
    /// Resize a window to its content.
    AutoSize,
    /// Reposition a window on its screen.
    Center,
}

impl RequestKind {
    /// All kinds, in phase priority order.
    pub const ALL: [Self; 4] = [Self::Sizing, Self::AutoSize, Self::Layout, Self::Center];

    /// Short lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sizing => "sizing",
            Self::Layout => "layout",
            Self::AutoSize => "auto-size",
            Self::Center => "center",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a request.
///
/// None of these are errors; a request never fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
    /// The handle was added to its pending set.
    Queued,
    /// The handle was already pending for this kind.
    AlreadyPending,
    /// The coordinator is torn down; the request was dropped.
    Ignored,
}

/// A deduplicating set of pending view handles.
///
/// Iteration follows insertion order, which gives the order-free phases a
/// deterministic (request) order.
#[derive(Clone, Debug, Default)]
pub struct PendingSet {
    ids: IndexSet<ViewId>,
}

impl PendingSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `id`, returning `true` if it was not already present.
    pub fn insert(&mut self, id: ViewId) -> bool {
        self.ids.insert(id)
    }

    /// Removes `id`, returning `true` if it was present.
    ///
    /// Preserves the relative order of the remaining entries.
    pub fn remove(&mut self, id: ViewId) -> bool {
        self.ids.shift_remove(&id)
    }

    /// Returns whether `id` is pending.
    #[must_use]
    pub fn contains(&self, id: ViewId) -> bool {
        self.ids.contains(&id)
    }

    /// Number of pending handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Removes and returns the oldest entry.
    pub fn pop_first(&mut self) -> Option<ViewId> {
        self.ids.shift_remove_index(0)
    }

    /// Adds every entry of `other` that is not already present.
    pub fn absorb(&mut self, other: Self) {
        self.ids.extend(other.ids);
    }

    /// Moves all entries out, leaving the set empty.
    #[must_use]
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }

    /// Iterates pending handles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.ids.iter().copied()
    }
}

impl IntoIterator for PendingSet {
    type Item = ViewId;
    type IntoIter = indexmap::set::IntoIter<ViewId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

/// The four pending sets.
#[derive(Clone, Debug, Default)]
pub struct PendingRequests {
    sizing: PendingSet,
    layout: PendingSet,
    auto_size: PendingSet,
    center: PendingSet,
}

impl PendingRequests {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, kind: RequestKind) -> &PendingSet {
        match kind {
            RequestKind::Sizing => &self.sizing,
            RequestKind::Layout => &self.layout,
            RequestKind::AutoSize => &self.auto_size,
            RequestKind::Center => &self.center,
        }
    }

    fn set_mut(&mut self, kind: RequestKind) -> &mut PendingSet {
        match kind {
            RequestKind::Sizing => &mut self.sizing,
            RequestKind::Layout => &mut self.layout,
            RequestKind::AutoSize => &mut self.auto_size,
            RequestKind::Center => &mut self.center,
        }
    }

    /// Inserts `id` into the `kind` set, returning `true` if it was new.
    pub fn insert(&mut self, kind: RequestKind, id: ViewId) -> bool {
        self.set_mut(kind).insert(id)
    }

    /// Swaps the `kind` set for an empty one and returns the old contents.
    #[must_use]
    pub fn take(&mut self, kind: RequestKind) -> PendingSet {
        self.set_mut(kind).take()
    }

    /// Removes a single entry, returning `true` if it was present.
    pub fn remove(&mut self, kind: RequestKind, id: ViewId) -> bool {
        self.set_mut(kind).remove(id)
    }

    /// Returns whether `id` is pending for `kind`.
    #[must_use]
    pub fn contains(&self, kind: RequestKind, id: ViewId) -> bool {
        self.set(kind).contains(id)
    }

    /// Snapshot of the `kind` set, in insertion order.
    #[must_use]
    pub fn ids(&self, kind: RequestKind) -> Vec<ViewId> {
        self.set(kind).iter().collect()
    }

    /// Number of pending entries for `kind`.
    #[must_use]
    pub fn len(&self, kind: RequestKind) -> usize {
        self.set(kind).len()
    }

    /// Returns whether all four sets are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        RequestKind::ALL.iter().all(|&k| self.set(k).is_empty())
    }

    /// Empties all four sets.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
