// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scriptable views that record every callback.
//!
//! A [`RecordingView`] appends each invocation to a shared [`CallLog`] and
//! keeps per-operation counts. Each operation can be scripted to fail (by
//! returning an error or by panicking) and can carry a hook that runs inside
//! the callback, with full access to the [`UpdateCx`]. Hooks are how tests
//! issue requests from within a pass.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use core::fmt;

use arbor_core::failure::Operation;
use arbor_core::view::{CallbackResult, UpdateCx, View, Window};

use crate::log::CallLog;

/// How a scripted callback ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailMode {
    /// Returns `Ok(())`.
    #[default]
    Never,
    /// Returns an [`InjectedFailure`].
    Error,
    /// Panics.
    Panic,
}

/// The error a view scripted with [`FailMode::Error`] returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("injected failure in {}", .operation.name())]
pub struct InjectedFailure {
    /// The callback that failed.
    pub operation: Operation,
}

/// Code run inside a callback before it returns.
pub type Hook = Arc<dyn Fn(&mut UpdateCx<'_>) + Send + Sync>;

#[derive(Clone, Default)]
struct Script {
    fail: FailMode,
    hook: Option<Hook>,
}

/// A view (and window) that logs its callbacks.
///
/// The same type serves as a plain view or as a window; which one it is
/// depends on how it was inserted into the tree.
pub struct RecordingView {
    log: CallLog,
    calls: [AtomicUsize; 4],
    scripts: Mutex<[Script; 4]>,
}

impl fmt::Debug for RecordingView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingView")
            .field("sizing_calls", &self.calls(Operation::UpdateSizingInfo))
            .field("layout_calls", &self.calls(Operation::Layout))
            .field("auto_size_calls", &self.calls(Operation::AutoSize))
            .field("center_calls", &self.calls(Operation::Center))
            .finish_non_exhaustive()
    }
}

impl RecordingView {
    /// Creates a view that records into `log`.
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            calls: std::array::from_fn(|_| AtomicUsize::new(0)),
            scripts: Mutex::new(std::array::from_fn(|_| Script::default())),
        }
    }

    fn scripts(&self) -> MutexGuard<'_, [Script; 4]> {
        self.scripts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The log this view records into.
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Makes `operation` end as `mode` from now on.
    pub fn fail_on(&self, operation: Operation, mode: FailMode) {
        self.scripts()[operation.index()].fail = mode;
    }

    /// Runs `hook` every time `operation` is invoked, replacing any earlier
    /// hook. The hook runs before the scripted failure, if any.
    pub fn on<F>(&self, operation: Operation, hook: F)
    where
        F: Fn(&mut UpdateCx<'_>) + Send + Sync + 'static,
    {
        self.scripts()[operation.index()].hook = Some(Arc::new(hook));
    }

    /// Removes the hook for `operation`.
    pub fn clear_hook(&self, operation: Operation) {
        self.scripts()[operation.index()].hook = None;
    }

    /// How many times `operation` has been invoked on this view.
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls[operation.index()].load(Ordering::Relaxed)
    }

    /// Total invocations across all operations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        Operation::ALL.iter().map(|&op| self.calls(op)).sum()
    }

    /// Resets the per-operation counts. The shared log is left alone.
    pub fn reset_calls(&self) {
        for count in &self.calls {
            count.store(0, Ordering::Relaxed);
        }
    }

    fn invoke(&self, operation: Operation, cx: &mut UpdateCx<'_>) -> CallbackResult {
        self.log.record(cx.view_id(), operation);
        self.calls[operation.index()].fetch_add(1, Ordering::Relaxed);

        // Clone out so the hook may rescript this view.
        let script = self.scripts()[operation.index()].clone();
        if let Some(hook) = script.hook {
            hook(cx);
        }
        match script.fail {
            FailMode::Never => Ok(()),
            FailMode::Error => Err(Box::new(InjectedFailure { operation })),
            FailMode::Panic => panic!("injected panic in {}", operation.name()),
        }
    }
}

impl View for RecordingView {
    fn update_sizing_info(&self, cx: &mut UpdateCx<'_>) -> CallbackResult {
        self.invoke(Operation::UpdateSizingInfo, cx)
    }

    fn layout(&self, cx: &mut UpdateCx<'_>) -> CallbackResult {
        self.invoke(Operation::Layout, cx)
    }
}

impl Window for RecordingView {
    fn auto_size(&self, cx: &mut UpdateCx<'_>) -> CallbackResult {
        self.invoke(Operation::AutoSize, cx)
    }

    fn center(&self, cx: &mut UpdateCx<'_>) -> CallbackResult {
        self.invoke(Operation::Center, cx)
    }
}
