// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View identity and the capability traits the coordinator drives.
//!
//! The coordinator never owns views. It stores [`ViewId`] handles and
//! resolves them through a [`ViewTree`](crate::tree::ViewTree) at the moment
//! a piece of work is about to run. A handle whose view has since been
//! removed resolves to nothing and the work is skipped.
//!
//! Ordinary views implement [`View`] (sizing info and layout). Top-level
//! windows implement [`Window`], which adds auto-sizing and centering.

use core::fmt;
use std::sync::Arc;

use crate::coordinator::LayoutCoordinator;
use crate::executor::{MainThreadExecutor, Task};
use crate::pending::RequestOutcome;
use crate::tree::ViewTree;

/// Boxed error returned by failing view callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a single view callback.
pub type CallbackResult = Result<(), BoxError>;

/// A handle to a view in a [`ViewTree`].
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a view is removed and the slot is reused.
///
/// The derived ordering (index, then generation) is arbitrary but stable and
/// serves as the tie-break between views at the same depth.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl ViewId {
    /// Builds a handle from raw parts.
    ///
    /// Useful for [`ViewTree`] implementations that keep their own arenas.
    #[inline]
    #[must_use]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
    }

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({}@gen{})", self.idx, self.generation)
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.idx, self.generation)
    }
}

/// Sizing and layout operations every view supports.
///
/// Callbacks run on the UI thread, one at a time, with no coordinator lock
/// held. They may request more work through the [`UpdateCx`], including for
/// themselves.
pub trait View: Send + Sync {
    /// Recomputes and caches this view's preferred-size data.
    fn update_sizing_info(&self, cx: &mut UpdateCx<'_>) -> CallbackResult;

    /// Positions and sizes this view's direct children.
    fn layout(&self, cx: &mut UpdateCx<'_>) -> CallbackResult;
}

/// A top-level view. Adds window-only operations to [`View`].
pub trait Window: View {
    /// Resizes the window to its content's preferred size.
    fn auto_size(&self, cx: &mut UpdateCx<'_>) -> CallbackResult;

    /// Repositions the window on its screen or work area.
    fn center(&self, cx: &mut UpdateCx<'_>) -> CallbackResult;
}

/// Context passed to every view callback.
///
/// Gives the callback its own id, read access to the tree, the request
/// operations, and the main-thread executor for posting deferred work.
pub struct UpdateCx<'a> {
    coordinator: &'a LayoutCoordinator,
    view: ViewId,
}

impl fmt::Debug for UpdateCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateCx")
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl<'a> UpdateCx<'a> {
    pub(crate) fn new(coordinator: &'a LayoutCoordinator, view: ViewId) -> Self {
        Self { coordinator, view }
    }

    /// The view this callback runs for.
    #[must_use]
    pub fn view_id(&self) -> ViewId {
        self.view
    }

    /// The tree the coordinator resolves views against.
    #[must_use]
    pub fn tree(&self) -> &'a dyn ViewTree {
        self.coordinator.tree()
    }

    /// The coordinator running this callback.
    #[must_use]
    pub fn coordinator(&self) -> &'a LayoutCoordinator {
        self.coordinator
    }

    /// A strong handle to the coordinator, for moving into posted tasks.
    ///
    /// Returns `None` only while the coordinator is being dropped.
    #[must_use]
    pub fn coordinator_handle(&self) -> Option<Arc<LayoutCoordinator>> {
        self.coordinator.handle()
    }

    /// The executor that runs work on the UI thread.
    #[must_use]
    pub fn executor(&self) -> &'a Arc<dyn MainThreadExecutor> {
        self.coordinator.executor()
    }

    /// Posts `task` to run later on the UI thread.
    ///
    /// This is how a callback models a queued change notification: the task
    /// runs after the current coordinator pass returns.
    pub fn post(&self, task: Task) {
        self.coordinator.executor().post(task);
    }

    /// Requests a sizing-info update for `view`.
    pub fn request_sizing_info(&self, view: ViewId) -> RequestOutcome {
        self.coordinator.request_sizing_info(view)
    }

    /// Requests a layout for `view`.
    pub fn request_layout(&self, view: ViewId) -> RequestOutcome {
        self.coordinator.request_layout(view)
    }

    /// Requests auto-sizing for `window`.
    pub fn request_auto_size(&self, window: ViewId) -> RequestOutcome {
        self.coordinator.request_auto_size(window)
    }

    /// Requests centering for `window`.
    pub fn request_center(&self, window: ViewId) -> RequestOutcome {
        self.coordinator.request_center(window)
    }
}
