// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The view tree contract and the default handle-based arena.
//!
//! The coordinator only needs three things from a tree: the parent of a view
//! (to compute depth), and a way to turn a [`ViewId`] back into a live
//! [`View`] or [`Window`]. [`ViewTree`] captures exactly that.
//!
//! [`ViewStore`] is the default implementation. Views are stored in
//! struct-of-arrays slots addressed by generational handles. Removed views
//! are recycled via a free list, and generation counters make old handles
//! resolve to nothing instead of to whatever reuses the slot.
//!
//! All topology lives behind one `RwLock`, the tree-structure lock. Depth
//! walks hold the read side for the duration of one walk so they never see
//! a half-applied reparent. The lock is never held while a view callback
//! runs: [`ViewTree::view`] hands out an `Arc` and releases the lock.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use core::fmt;

use crate::view::{View, ViewId, Window};

/// Sentinel value indicating "no view" in index fields.
pub const INVALID: u32 = u32::MAX;

/// Read access the coordinator needs from a view tree.
pub trait ViewTree: Send + Sync {
    /// Returns the parent of `view`, or `None` for roots and stale handles.
    fn parent(&self, view: ViewId) -> Option<ViewId>;

    /// Resolves `view` to a live view, or `None` if it is gone.
    fn view(&self, view: ViewId) -> Option<Arc<dyn View>>;

    /// Resolves `window` to a live window, or `None` if it is gone or is not
    /// a window.
    fn window(&self, window: ViewId) -> Option<Arc<dyn Window>>;

    /// Number of ancestor hops from `view` to its root.
    ///
    /// The default walks [`parent`](Self::parent). Implementations that
    /// guard topology with a lock should override this to hold the lock for
    /// the whole walk.
    fn depth(&self, view: ViewId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(view);
        while let Some(p) = current {
            depth += 1;
            current = self.parent(p);
        }
        depth
    }
}

/// Topology misuse reported by [`ViewStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The handle refers to a view that has been removed.
    #[error("stale view handle {0}")]
    Stale(ViewId),
    /// The view is already attached to a parent.
    #[error("{0} already has a parent")]
    AlreadyHasParent(ViewId),
    /// The view is not attached to a parent.
    #[error("{0} has no parent")]
    NoParent(ViewId),
    /// The view still has children and cannot be removed.
    #[error("{0} still has children")]
    HasChildren(ViewId),
    /// Windows are top-level and cannot be attached under another view.
    #[error("window {0} cannot be a child")]
    WindowNotTopLevel(ViewId),
    /// Attaching would make a view its own ancestor.
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle {
        /// The view being attached.
        child: ViewId,
        /// The requested parent.
        parent: ViewId,
    },
}

#[derive(Clone)]
enum Node {
    View(Arc<dyn View>),
    Window(Arc<dyn Window>),
}

impl Node {
    fn as_view(&self) -> Arc<dyn View> {
        match self {
            Self::View(v) => Arc::clone(v),
            Self::Window(w) => Arc::clone(w) as Arc<dyn View>,
        }
    }

    fn is_window(&self) -> bool {
        matches!(self, Self::Window(_))
    }
}

/// Struct-of-arrays slot storage. Only ever accessed under the store's lock.
#[derive(Default)]
struct Slots {
    // -- Topology --
    parent: Vec<u32>,
    first_child: Vec<u32>,
    next_sibling: Vec<u32>,
    prev_sibling: Vec<u32>,

    // -- Payload --
    node: Vec<Option<Node>>,

    // -- Allocation --
    generation: Vec<u32>,
    free_list: Vec<u32>,
    live: usize,
}

impl Slots {
    fn len(&self) -> u32 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "slot count is bounded by u32 indices"
        )]
        let len = self.node.len() as u32;
        len
    }

    fn is_alive(&self, id: ViewId) -> bool {
        id.idx < self.len()
            && self.generation[id.idx as usize] == id.generation
            && self.node[id.idx as usize].is_some()
    }

    fn validate(&self, id: ViewId) -> Result<u32, TreeError> {
        if self.is_alive(id) {
            Ok(id.idx)
        } else {
            Err(TreeError::Stale(id))
        }
    }

    fn id_at(&self, idx: u32) -> ViewId {
        ViewId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn insert(&mut self, node: Node) -> ViewId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot. The generation was bumped on removal.
            self.parent[idx as usize] = INVALID;
            self.first_child[idx as usize] = INVALID;
            self.next_sibling[idx as usize] = INVALID;
            self.prev_sibling[idx as usize] = INVALID;
            self.node[idx as usize] = Some(node);
            idx
        } else {
            let idx = self.len();
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.node.push(Some(node));
            self.generation.push(0);
            idx
        };
        self.live += 1;
        self.id_at(idx)
    }

    /// Returns whether `ancestor` is `idx` or one of its ancestors.
    fn is_ancestor_or_self(&self, ancestor: u32, mut idx: u32) -> bool {
        while idx != INVALID {
            if idx == ancestor {
                return true;
            }
            idx = self.parent[idx as usize];
        }
        false
    }

    fn check_attachable(&self, child: ViewId, parent: ViewId) -> Result<(u32, u32), TreeError> {
        let c = self.validate(child)?;
        let p = self.validate(parent)?;
        if self.node[c as usize].as_ref().is_some_and(Node::is_window) {
            return Err(TreeError::WindowNotTopLevel(child));
        }
        if self.is_ancestor_or_self(c, p) {
            return Err(TreeError::Cycle { child, parent });
        }
        Ok((c, p))
    }

    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn depth(&self, id: ViewId) -> usize {
        if !self.is_alive(id) {
            return 0;
        }
        let mut depth = 0;
        let mut idx = self.parent[id.idx as usize];
        while idx != INVALID {
            depth += 1;
            idx = self.parent[idx as usize];
        }
        depth
    }
}

/// Handle-based arena of views and windows.
///
/// Owns the views; everything else (including the coordinator) refers to
/// them by [`ViewId`].
pub struct ViewStore {
    slots: RwLock<Slots>,
}

impl fmt::Debug for ViewStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Allocation API --

    /// Adds a detached view and returns its handle.
    pub fn insert_view(&self, view: Arc<dyn View>) -> ViewId {
        self.write().insert(Node::View(view))
    }

    /// Adds a top-level window and returns its handle.
    pub fn insert_window(&self, window: Arc<dyn Window>) -> ViewId {
        self.write().insert(Node::Window(window))
    }

    /// Removes a view, freeing its slot for reuse.
    ///
    /// The view is detached from its parent first. Views with children must
    /// have them removed or reparented beforehand.
    pub fn remove(&self, id: ViewId) -> Result<(), TreeError> {
        let mut slots = self.write();
        let idx = slots.validate(id)?;
        if slots.first_child[idx as usize] != INVALID {
            return Err(TreeError::HasChildren(id));
        }
        if slots.parent[idx as usize] != INVALID {
            slots.unlink_from_parent(idx);
        }

        // Bump generation so old handles immediately fail validation.
        slots.generation[idx as usize] = slots.generation[idx as usize].wrapping_add(1);
        slots.node[idx as usize] = None;
        slots.free_list.push(idx);
        slots.live -= 1;
        Ok(())
    }

    /// Returns whether the given handle refers to a live view.
    #[must_use]
    pub fn is_alive(&self, id: ViewId) -> bool {
        self.read().is_alive(id)
    }

    /// Returns whether `id` is a live window.
    #[must_use]
    pub fn is_window(&self, id: ViewId) -> bool {
        let slots = self.read();
        slots.is_alive(id) && slots.node[id.idx as usize].as_ref().is_some_and(Node::is_window)
    }

    /// Number of live views (windows included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().live
    }

    /// Returns whether the store holds no live views.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    pub fn add_child(&self, parent: ViewId, child: ViewId) -> Result<(), TreeError> {
        let mut slots = self.write();
        let (c, p) = slots.check_attachable(child, parent)?;
        if slots.parent[c as usize] != INVALID {
            return Err(TreeError::AlreadyHasParent(child));
        }
        slots.link_last(p, c);
        Ok(())
    }

    /// Inserts `child` before `sibling` in the sibling list.
    ///
    /// `child` must not already have a parent; `sibling` must have one.
    pub fn insert_before(&self, child: ViewId, sibling: ViewId) -> Result<(), TreeError> {
        let mut slots = self.write();
        let s = slots.validate(sibling)?;
        let p = slots.parent[s as usize];
        if p == INVALID {
            return Err(TreeError::NoParent(sibling));
        }
        let parent = slots.id_at(p);
        let (c, _) = slots.check_attachable(child, parent)?;
        if slots.parent[c as usize] != INVALID {
            return Err(TreeError::AlreadyHasParent(child));
        }

        slots.parent[c as usize] = p;
        slots.next_sibling[c as usize] = s;
        slots.prev_sibling[c as usize] = slots.prev_sibling[s as usize];

        let prev = slots.prev_sibling[s as usize];
        if prev != INVALID {
            slots.next_sibling[prev as usize] = c;
        } else {
            // `sibling` was the first child.
            slots.first_child[p as usize] = c;
        }
        slots.prev_sibling[s as usize] = c;
        Ok(())
    }

    /// Removes `child` from its current parent.
    pub fn remove_from_parent(&self, child: ViewId) -> Result<(), TreeError> {
        let mut slots = self.write();
        let c = slots.validate(child)?;
        if slots.parent[c as usize] == INVALID {
            return Err(TreeError::NoParent(child));
        }
        slots.unlink_from_parent(c);
        Ok(())
    }

    /// Moves `child` to be the last child of `new_parent`.
    ///
    /// If `child` already has a parent, it is detached first. The move is
    /// atomic with respect to depth queries.
    pub fn reparent(&self, child: ViewId, new_parent: ViewId) -> Result<(), TreeError> {
        let mut slots = self.write();
        let (c, p) = slots.check_attachable(child, new_parent)?;
        if slots.parent[c as usize] != INVALID {
            slots.unlink_from_parent(c);
        }
        slots.link_last(p, c);
        Ok(())
    }

    /// Returns the direct children of a view, in order.
    ///
    /// Stale handles have no children.
    #[must_use]
    pub fn children(&self, id: ViewId) -> Vec<ViewId> {
        let slots = self.read();
        let mut out = Vec::new();
        if !slots.is_alive(id) {
            return out;
        }
        let mut current = slots.first_child[id.idx as usize];
        while current != INVALID {
            out.push(slots.id_at(current));
            current = slots.next_sibling[current as usize];
        }
        out
    }

    /// Returns the live views that have no parent.
    #[must_use]
    pub fn roots(&self) -> Vec<ViewId> {
        let slots = self.read();
        (0..slots.len())
            .filter(|&idx| {
                slots.node[idx as usize].is_some() && slots.parent[idx as usize] == INVALID
            })
            .map(|idx| slots.id_at(idx))
            .collect()
    }
}

impl ViewTree for ViewStore {
    fn parent(&self, view: ViewId) -> Option<ViewId> {
        let slots = self.read();
        if !slots.is_alive(view) {
            return None;
        }
        let p = slots.parent[view.idx as usize];
        (p != INVALID).then(|| slots.id_at(p))
    }

    fn view(&self, view: ViewId) -> Option<Arc<dyn View>> {
        let slots = self.read();
        if !slots.is_alive(view) {
            return None;
        }
        slots.node[view.idx as usize].as_ref().map(Node::as_view)
    }

    fn window(&self, window: ViewId) -> Option<Arc<dyn Window>> {
        let slots = self.read();
        if !slots.is_alive(window) {
            return None;
        }
        match slots.node[window.idx as usize].as_ref() {
            Some(Node::Window(w)) => Some(Arc::clone(w)),
            _ => None,
        }
    }

    fn depth(&self, view: ViewId) -> usize {
        self.read().depth(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{CallbackResult, UpdateCx};

    struct Inert;

    impl View for Inert {
        fn update_sizing_info(&self, _cx: &mut UpdateCx<'_>) -> CallbackResult {
            Ok(())
        }

        fn layout(&self, _cx: &mut UpdateCx<'_>) -> CallbackResult {
            Ok(())
        }
    }

    impl Window for Inert {
        fn auto_size(&self, _cx: &mut UpdateCx<'_>) -> CallbackResult {
            Ok(())
        }

        fn center(&self, _cx: &mut UpdateCx<'_>) -> CallbackResult {
            Ok(())
        }
    }

    fn view(store: &ViewStore) -> ViewId {
        store.insert_view(Arc::new(Inert))
    }

    #[test]
    fn insert_and_remove() {
        let store = ViewStore::new();
        let id = view(&store);
        assert!(store.is_alive(id));
        assert_eq!(store.len(), 1);
        store.remove(id).unwrap();
        assert!(!store.is_alive(id));
        assert!(store.is_empty());
        assert!(store.view(id).is_none());
    }

    #[test]
    fn generation_prevents_stale_access() {
        let store = ViewStore::new();
        let id1 = view(&store);
        store.remove(id1).unwrap();
        let id2 = view(&store);
        // id2 reuses the same slot but has a different generation.
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.index(), id2.index());
        assert_ne!(id1.generation(), id2.generation());
        assert_eq!(store.remove(id1), Err(TreeError::Stale(id1)));
    }

    #[test]
    fn add_child_and_query() {
        let store = ViewStore::new();
        let parent = view(&store);
        let child1 = view(&store);
        let child2 = view(&store);

        store.add_child(parent, child1).unwrap();
        store.add_child(parent, child2).unwrap();

        assert_eq!(store.parent(child1), Some(parent));
        assert_eq!(store.parent(child2), Some(parent));
        assert_eq!(store.children(parent), vec![child1, child2]);
        assert_eq!(
            store.add_child(parent, child1),
            Err(TreeError::AlreadyHasParent(child1))
        );
    }

    #[test]
    fn insert_before_works() {
        let store = ViewStore::new();
        let parent = view(&store);
        let a = view(&store);
        let b = view(&store);
        let c = view(&store);

        store.add_child(parent, a).unwrap();
        store.add_child(parent, c).unwrap();
        store.insert_before(b, c).unwrap();
        assert_eq!(store.children(parent), vec![a, b, c]);

        let d = view(&store);
        store.insert_before(d, a).unwrap();
        assert_eq!(store.children(parent), vec![d, a, b, c]);
    }

    #[test]
    fn remove_from_parent_and_reparent() {
        let store = ViewStore::new();
        let p1 = view(&store);
        let p2 = view(&store);
        let child = view(&store);

        store.add_child(p1, child).unwrap();
        store.reparent(child, p2).unwrap();
        assert_eq!(store.parent(child), Some(p2));
        assert!(store.children(p1).is_empty());

        store.remove_from_parent(child).unwrap();
        assert_eq!(store.parent(child), None);
        assert_eq!(
            store.remove_from_parent(child),
            Err(TreeError::NoParent(child))
        );
    }

    #[test]
    fn remove_with_children_is_rejected() {
        let store = ViewStore::new();
        let parent = view(&store);
        let child = view(&store);
        store.add_child(parent, child).unwrap();
        assert_eq!(store.remove(parent), Err(TreeError::HasChildren(parent)));

        store.remove(child).unwrap();
        assert!(store.children(parent).is_empty());
        store.remove(parent).unwrap();
    }

    #[test]
    fn cycles_are_rejected() {
        let store = ViewStore::new();
        let a = view(&store);
        let b = view(&store);
        let c = view(&store);
        store.add_child(a, b).unwrap();
        store.add_child(b, c).unwrap();

        assert_eq!(
            store.reparent(a, c),
            Err(TreeError::Cycle {
                child: a,
                parent: c
            })
        );
        assert_eq!(
            store.reparent(a, a),
            Err(TreeError::Cycle {
                child: a,
                parent: a
            })
        );
    }

    #[test]
    fn windows_stay_top_level() {
        let store = ViewStore::new();
        let w = store.insert_window(Arc::new(Inert));
        let v = view(&store);
        assert!(store.is_window(w));
        assert!(!store.is_window(v));
        assert_eq!(store.add_child(v, w), Err(TreeError::WindowNotTopLevel(w)));
        assert!(store.window(w).is_some());
        assert!(store.window(v).is_none());
        assert!(store.view(w).is_some());
    }

    #[test]
    fn depth_counts_ancestor_hops() {
        let store = ViewStore::new();
        let w = store.insert_window(Arc::new(Inert));
        let a = view(&store);
        let b = view(&store);
        store.add_child(w, a).unwrap();
        store.add_child(a, b).unwrap();

        assert_eq!(store.depth(w), 0);
        assert_eq!(store.depth(a), 1);
        assert_eq!(store.depth(b), 2);

        store.remove_from_parent(a).unwrap();
        assert_eq!(store.depth(b), 1);
    }

    #[test]
    fn default_depth_matches_override() {
        struct Walk<'a>(&'a ViewStore);

        impl ViewTree for Walk<'_> {
            fn parent(&self, view: ViewId) -> Option<ViewId> {
                self.0.parent(view)
            }

            fn view(&self, view: ViewId) -> Option<Arc<dyn View>> {
                self.0.view(view)
            }

            fn window(&self, window: ViewId) -> Option<Arc<dyn Window>> {
                self.0.window(window)
            }
        }

        let store = ViewStore::new();
        let a = view(&store);
        let b = view(&store);
        let c = view(&store);
        store.add_child(a, b).unwrap();
        store.add_child(b, c).unwrap();

        let walk = Walk(&store);
        for id in [a, b, c] {
            assert_eq!(walk.depth(id), store.depth(id));
        }
    }

    #[test]
    fn roots_returns_parentless_views() {
        let store = ViewStore::new();
        let r1 = view(&store);
        let r2 = view(&store);
        let child = view(&store);
        store.add_child(r1, child).unwrap();

        assert_eq!(store.roots(), vec![r1, r2]);
    }
}
