// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small box-layout toolkit built on the coordinator.
//!
//! These views compute real geometry with [`kurbo`] and drive each other the
//! way a retained-mode toolkit does: a changed preferred size or frame is
//! reported through a change notification that is posted to the UI thread
//! and turns into new layout requests when it runs.
//!
//! - [`BoxView`]: a leaf with a fixed content size.
//! - [`StackView`]: stacks its children vertically.
//! - [`FrameWindow`]: a top-level window that auto-sizes to its content and
//!   centers itself on a screen rectangle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use core::fmt;

use arbor_core::coordinator::LayoutCoordinator;
use arbor_core::tree::{TreeError, ViewStore};
use arbor_core::view::{CallbackResult, UpdateCx, View, ViewId, Window};
use kurbo::{Point, Rect, Size};

/// Cached geometry of one box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Geometry {
    /// Size the box would like to have, as of its last sizing update.
    pub preferred: Size,
    /// Frame assigned by the parent, in parent coordinates. Windows use
    /// screen coordinates.
    pub frame: Rect,
}

/// Interior-mutable [`Geometry`] shared between the UI thread and tests.
#[derive(Debug, Default)]
pub struct GeometryCell {
    inner: Mutex<Geometry>,
}

impl GeometryCell {
    fn lock(&self) -> MutexGuard<'_, Geometry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current geometry.
    #[must_use]
    pub fn get(&self) -> Geometry {
        *self.lock()
    }

    /// Stores a new preferred size, returning whether it changed.
    pub fn set_preferred(&self, size: Size) -> bool {
        let mut geometry = self.lock();
        if geometry.preferred == size {
            return false;
        }
        geometry.preferred = size;
        true
    }

    /// Stores a new frame, returning whether it changed.
    pub fn set_frame(&self, frame: Rect) -> bool {
        let mut geometry = self.lock();
        if geometry.frame == frame {
            return false;
        }
        geometry.frame = frame;
        true
    }
}

/// A view that takes part in box layout.
pub trait BoxNode: View {
    /// The box's cached geometry.
    fn geometry(&self) -> &GeometryCell;

    /// Preferred size as of the last sizing update.
    fn preferred_size(&self) -> Size {
        self.geometry().get().preferred
    }

    /// Current frame.
    fn frame(&self) -> Rect {
        self.geometry().get().frame
    }
}

/// Posts `notify` to run on the UI thread after the current pass.
fn post_notification(cx: &UpdateCx<'_>, notify: impl FnOnce(&LayoutCoordinator) + Send + 'static) {
    if let Some(coordinator) = cx.coordinator_handle() {
        cx.post(Box::new(move || notify(&coordinator)));
    }
}

/// A child's preferred size changed: its parent must re-measure and re-lay
/// out.
fn notify_preferred_size_changed(cx: &UpdateCx<'_>) {
    let view = cx.view_id();
    tracing::trace!(%view, "preferred size changed");
    post_notification(cx, move |coordinator| {
        if let Some(parent) = coordinator.tree().parent(view) {
            coordinator.request_sizing_info(parent);
            coordinator.request_layout(parent);
        }
    });
}

/// A view's frame changed: it must lay out its own children again.
fn notify_frame_changed(cx: &UpdateCx<'_>, view: ViewId) {
    tracing::trace!(%view, "frame changed");
    post_notification(cx, move |coordinator| {
        coordinator.request_layout(view);
    });
}

/// Makes `id` the last child of `parent`. On failure `id` is removed from
/// the store again so no orphan is left behind.
pub(crate) fn attach(store: &ViewStore, parent: ViewId, id: ViewId) -> Result<(), TreeError> {
    let Err(err) = store.add_child(parent, id) else {
        return Ok(());
    };
    if let Err(rollback) = store.remove(id) {
        tracing::warn!(%id, %rollback, "could not discard unattached view");
    }
    Err(err)
}

/// A leaf box with a fixed content size.
#[derive(Debug, Default)]
pub struct BoxView {
    content: Mutex<Size>,
    geometry: GeometryCell,
}

impl BoxView {
    /// Creates a leaf whose content is `size`.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            content: Mutex::new(size),
            geometry: GeometryCell::default(),
        }
    }

    /// Changes the content size. Takes effect at the next sizing update.
    pub fn set_content_size(&self, size: Size) {
        *self.content.lock().unwrap_or_else(PoisonError::into_inner) = size;
    }
}

impl View for BoxView {
    fn update_sizing_info(&self, cx: &mut UpdateCx<'_>) -> CallbackResult {
        let size = *self.content.lock().unwrap_or_else(PoisonError::into_inner);
        if self.geometry.set_preferred(size) {
            notify_preferred_size_changed(cx);
        }
        Ok(())
    }

    fn layout(&self, _cx: &mut UpdateCx<'_>) -> CallbackResult {
        Ok(())
    }
}

impl BoxNode for BoxView {
    fn geometry(&self) -> &GeometryCell {
        &self.geometry
    }
}

type Child = (ViewId, Arc<dyn BoxNode>);

/// Lays its children out top to bottom, each as wide as the stack.
///
/// Preferred width is the widest child; preferred height is the sum of the
/// children's heights plus `spacing` between neighbors.
pub struct StackView {
    spacing: f64,
    children: Mutex<Vec<Child>>,
    geometry: GeometryCell,
}

impl fmt::Debug for StackView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackView")
            .field("spacing", &self.spacing)
            .field("children", &self.children().len())
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl StackView {
    /// Creates an empty stack.
    #[must_use]
    pub fn new(spacing: f64) -> Self {
        Self {
            spacing,
            children: Mutex::new(Vec::new()),
            geometry: GeometryCell::default(),
        }
    }

    fn children(&self) -> MutexGuard<'_, Vec<Child>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `child` into `store` as the last child of `this` (the stack's
    /// own handle) and returns the child's handle.
    pub fn push<N: BoxNode + 'static>(
        &self,
        store: &ViewStore,
        this: ViewId,
        child: Arc<N>,
    ) -> Result<ViewId, TreeError> {
        let id = store.insert_view(Arc::clone(&child) as Arc<dyn View>);
        attach(store, this, id)?;
        let node: Arc<dyn BoxNode> = child;
        self.children().push((id, node));
        Ok(id)
    }

    /// Handles of the stacked children, top first.
    #[must_use]
    pub fn child_ids(&self) -> Vec<ViewId> {
        self.children().iter().map(|(id, _)| *id).collect()
    }
}

impl View for StackView {
    fn update_sizing_info(&self, cx: &mut UpdateCx<'_>) -> CallbackResult {
        let children = self.children().clone();
        let mut size = Size::ZERO;
        for (i, (_, child)) in children.iter().enumerate() {
            let preferred = child.preferred_size();
            size.width = size.width.max(preferred.width);
            size.height += preferred.height;
            if i > 0 {
                size.height += self.spacing;
            }
        }
        if self.geometry.set_preferred(size) {
            notify_preferred_size_changed(cx);
        }
        Ok(())
    }

    fn layout(&self, cx: &mut UpdateCx<'_>) -> CallbackResult {
        let width = self.geometry.get().frame.width();
        let children = self.children().clone();
        let mut y = 0.0;
        for (id, child) in &children {
            let height = child.preferred_size().height;
            let frame = Rect::from_origin_size(Point::new(0.0, y), Size::new(width, height));
            if child.geometry().set_frame(frame) {
                notify_frame_changed(cx, *id);
            }
            y += height + self.spacing;
        }
        Ok(())
    }
}

impl BoxNode for StackView {
    fn geometry(&self) -> &GeometryCell {
        &self.geometry
    }
}

/// A top-level window holding one content box.
///
/// Its frame is in screen coordinates. [`auto_size`](Window::auto_size)
/// resizes it to the content's preferred size and
/// [`center`](Window::center) moves it to the middle of `screen`.
pub struct FrameWindow {
    screen: Rect,
    content: Mutex<Option<Child>>,
    geometry: GeometryCell,
}

impl fmt::Debug for FrameWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameWindow")
            .field("screen", &self.screen)
            .field("content", &self.content_id())
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl FrameWindow {
    /// Creates an empty window on `screen`.
    #[must_use]
    pub fn new(screen: Rect) -> Self {
        Self {
            screen,
            content: Mutex::new(None),
            geometry: GeometryCell::default(),
        }
    }

    fn content(&self) -> Option<Child> {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Handle of the content box, if one was set.
    #[must_use]
    pub fn content_id(&self) -> Option<ViewId> {
        self.content().map(|(id, _)| id)
    }

    /// Inserts `content` into `store` under `this` (the window's own handle).
    ///
    /// A window holds one content box; a second call fails.
    pub fn set_content<N: BoxNode + 'static>(
        &self,
        store: &ViewStore,
        this: ViewId,
        content: Arc<N>,
    ) -> Result<ViewId, TreeError> {
        let mut slot = self.content.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((existing, _)) = slot.as_ref() {
            return Err(TreeError::AlreadyHasParent(*existing));
        }
        let id = store.insert_view(Arc::clone(&content) as Arc<dyn View>);
        attach(store, this, id)?;
        let node: Arc<dyn BoxNode> = content;
        *slot = Some((id, node));
        Ok(id)
    }

    /// The screen rectangle the window centers on.
    #[must_use]
    pub fn screen(&self) -> Rect {
        self.screen
    }
}

impl View for FrameWindow {
    fn update_sizing_info(&self, cx: &mut UpdateCx<'_>) -> CallbackResult {
        let size = self
            .content()
            .map_or(Size::ZERO, |(_, content)| content.preferred_size());
        if self.geometry.set_preferred(size) {
            let window = cx.view_id();
            tracing::trace!(%window, "window content size changed");
            post_notification(cx, move |coordinator| {
                coordinator.request_auto_size(window);
                coordinator.request_layout(window);
            });
        }
        Ok(())
    }

    fn layout(&self, cx: &mut UpdateCx<'_>) -> CallbackResult {
        let Some((id, content)) = self.content() else {
            return Ok(());
        };
        let bounds = Rect::from_origin_size(Point::ZERO, self.geometry.get().frame.size());
        if content.geometry().set_frame(bounds) {
            notify_frame_changed(cx, id);
        }
        Ok(())
    }
}

impl Window for FrameWindow {
    fn auto_size(&self, cx: &mut UpdateCx<'_>) -> CallbackResult {
        let geometry = self.geometry.get();
        let frame = geometry.frame.with_size(geometry.preferred);
        if self.geometry.set_frame(frame) {
            notify_frame_changed(cx, cx.view_id());
        }
        Ok(())
    }

    fn center(&self, _cx: &mut UpdateCx<'_>) -> CallbackResult {
        let frame = self.geometry.get().frame;
        let origin = self.screen.center() - frame.size().to_vec2() / 2.0;
        self.geometry.set_frame(frame.with_origin(origin));
        Ok(())
    }
}

impl BoxNode for FrameWindow {
    fn geometry(&self) -> &GeometryCell {
        &self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_cell_reports_changes() {
        let cell = GeometryCell::default();
        assert!(cell.set_preferred(Size::new(10.0, 5.0)));
        assert!(!cell.set_preferred(Size::new(10.0, 5.0)));
        assert!(cell.set_frame(Rect::new(0.0, 0.0, 10.0, 5.0)));
        assert!(!cell.set_frame(Rect::new(0.0, 0.0, 10.0, 5.0)));
        assert_eq!(cell.get().preferred, Size::new(10.0, 5.0));
    }

    #[test]
    fn second_content_is_rejected() {
        let store = ViewStore::new();
        let window = Arc::new(FrameWindow::new(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let w = store.insert_window(Arc::clone(&window) as Arc<dyn Window>);
        let first = window
            .set_content(&store, w, Arc::new(BoxView::new(Size::new(1.0, 1.0))))
            .unwrap();
        let err = window
            .set_content(&store, w, Arc::new(BoxView::new(Size::new(2.0, 2.0))))
            .unwrap_err();
        assert_eq!(err, TreeError::AlreadyHasParent(first));
        assert_eq!(store.len(), 2);
        assert_eq!(window.content_id(), Some(first));
    }

    #[test]
    fn push_onto_removed_stack_leaves_no_orphan() {
        let store = ViewStore::new();
        let stack = Arc::new(StackView::new(0.0));
        let s = store.insert_view(Arc::clone(&stack) as Arc<dyn View>);
        store.remove(s).unwrap();

        let err = stack
            .push(&store, s, Arc::new(BoxView::new(Size::new(1.0, 1.0))))
            .unwrap_err();
        assert_eq!(err, TreeError::Stale(s));
        assert!(store.is_empty());
        assert!(stack.child_ids().is_empty());
    }

    #[test]
    fn push_attaches_in_order() {
        let store = ViewStore::new();
        let stack = Arc::new(StackView::new(4.0));
        let s = store.insert_view(Arc::clone(&stack) as Arc<dyn View>);
        let a = stack
            .push(&store, s, Arc::new(BoxView::new(Size::new(1.0, 1.0))))
            .unwrap();
        let b = stack
            .push(&store, s, Arc::new(BoxView::new(Size::new(1.0, 1.0))))
            .unwrap();
        assert_eq!(stack.child_ids(), vec![a, b]);
        assert_eq!(store.children(s), vec![a, b]);
    }
}
