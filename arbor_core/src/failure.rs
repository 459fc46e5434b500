// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Containment of failing view callbacks.
//!
//! Every callback the coordinator invokes is wrapped so that a failure in one
//! view never stops the rest of a phase. A callback fails either by returning
//! `Err` or by panicking. Both are turned into a [`CallbackFailure`] and
//! handed to the coordinator's [`FailureHandler`], after which the phase
//! carries on with the next item.

use std::any::Any;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::pending::RequestKind;
use crate::view::{BoxError, ViewId};

/// The callback that was running when a failure occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`View::update_sizing_info`](crate::View::update_sizing_info).
    UpdateSizingInfo,
    /// [`View::layout`](crate::View::layout).
    Layout,
    /// [`Window::auto_size`](crate::Window::auto_size).
    AutoSize,
    /// [`Window::center`](crate::Window::center).
    Center,
}

impl Operation {
    /// All operations, in phase priority order.
    pub const ALL: [Self; 4] = [
        Self::UpdateSizingInfo,
        Self::AutoSize,
        Self::Layout,
        Self::Center,
    ];

    /// Name reported to the failure handler.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UpdateSizingInfo => "LayoutCoordinator::update_sizing_info",
            Self::Layout => "LayoutCoordinator::layout",
            Self::AutoSize => "LayoutCoordinator::auto_size",
            Self::Center => "LayoutCoordinator::center",
        }
    }

    /// The pending request kind this operation consumes.
    #[must_use]
    pub const fn kind(self) -> RequestKind {
        match self {
            Self::UpdateSizingInfo => RequestKind::Sizing,
            Self::Layout => RequestKind::Layout,
            Self::AutoSize => RequestKind::AutoSize,
            Self::Center => RequestKind::Center,
        }
    }

    /// Dense index in `0..4`, usable for per-operation arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::UpdateSizingInfo => 0,
            Self::Layout => 1,
            Self::AutoSize => 2,
            Self::Center => 3,
        }
    }
}

impl From<RequestKind> for Operation {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Sizing => Self::UpdateSizingInfo,
            RequestKind::Layout => Self::Layout,
            RequestKind::AutoSize => Self::AutoSize,
            RequestKind::Center => Self::Center,
        }
    }
}

/// Why a callback did not complete.
#[derive(Debug, thiserror::Error)]
pub enum CallbackFailure {
    /// The callback returned an error.
    #[error("callback returned an error: {0}")]
    Error(#[source] BoxError),
    /// The callback panicked. Carries the panic message when the payload was
    /// a string.
    #[error("callback panicked{}", panic_suffix(.0))]
    Panic(Option<String>),
}

impl CallbackFailure {
    /// Builds a [`Panic`](Self::Panic) failure from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::Panic(panic_message(payload))
    }

    /// The typed error, if the callback returned one.
    ///
    /// `None` for panics: the payload of a panic is opaque.
    #[must_use]
    pub fn error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Error(e) => Some(e.as_ref()),
            Self::Panic(_) => None,
        }
    }

    /// Returns whether the callback panicked.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic(_))
    }
}

fn panic_suffix(message: &Option<String>) -> String {
    message.as_ref().map(|m| format!(": {m}")).unwrap_or_default()
}

/// Extracts the message from a panic payload, if it is a string.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        Some((*s).to_owned())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}

/// Receives contained callback failures.
///
/// The handler runs on the UI thread, inside the pass, right after the
/// failing callback returned. It must not fail itself.
pub trait FailureHandler: Send + Sync {
    /// Called once per failed callback.
    fn handle_failure(&self, operation: Operation, view: ViewId, failure: &CallbackFailure);
}

/// The default handler: logs each failure at error level and swallows it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogFailures;

impl FailureHandler for LogFailures {
    fn handle_failure(&self, operation: Operation, view: ViewId, failure: &CallbackFailure) {
        tracing::error!(
            operation = operation.name(),
            %view,
            panicked = failure.is_panic(),
            "{failure}"
        );
    }
}

/// A handler that counts failures per operation instead of logging them.
#[derive(Debug, Default)]
pub struct CountFailures {
    counts: Mutex<[usize; 4]>,
    last: Mutex<Option<(Operation, ViewId)>>,
}

impl CountFailures {
    /// Creates a handler with all counts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures recorded for `operation`.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)[operation.index()]
    }

    /// Failures recorded across all operations.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .sum()
    }

    /// The most recent failure's operation and view.
    #[must_use]
    pub fn last(&self) -> Option<(Operation, ViewId)> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resets every count to zero.
    pub fn reset(&self) {
        *self.counts.lock().unwrap_or_else(PoisonError::into_inner) = [0; 4];
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl FailureHandler for CountFailures {
    fn handle_failure(&self, operation: Operation, view: ViewId, failure: &CallbackFailure) {
        tracing::debug!(operation = operation.name(), %view, "counted failure: {failure}");
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)[operation.index()] += 1;
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some((operation, view));
    }
}

#[cfg(test)]
mod tests {
    use std::panic;

    use super::*;

    #[test]
    fn operation_names() {
        assert_eq!(
            Operation::UpdateSizingInfo.name(),
            "LayoutCoordinator::update_sizing_info"
        );
        assert_eq!(Operation::Center.name(), "LayoutCoordinator::center");
        let mut seen = [false; 4];
        for op in Operation::ALL {
            assert_eq!(Operation::from(op.kind()), op);
            assert!(!seen[op.index()]);
            seen[op.index()] = true;
        }
    }

    #[test]
    fn panic_payloads() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        let failure = CallbackFailure::from_panic(payload.as_ref());
        assert!(failure.is_panic());
        assert!(failure.error().is_none());
        assert_eq!(failure.to_string(), "callback panicked: boom 7");

        let payload = panic::catch_unwind(|| panic::panic_any(42_u8)).unwrap_err();
        let failure = CallbackFailure::from_panic(payload.as_ref());
        assert!(matches!(failure, CallbackFailure::Panic(None)));
        assert_eq!(failure.to_string(), "callback panicked");

        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()).as_deref(), Some("static"));
    }

    #[test]
    fn error_failures_expose_source() {
        let failure = CallbackFailure::Error("bla".into());
        assert!(!failure.is_panic());
        assert_eq!(failure.error().map(ToString::to_string).as_deref(), Some("bla"));
        assert_eq!(failure.to_string(), "callback returned an error: bla");
    }

    #[test]
    fn count_failures_tracks_per_operation() {
        let counter = CountFailures::new();
        let view = ViewId::from_raw_parts(1, 0);
        let failure = CallbackFailure::Panic(None);
        counter.handle_failure(Operation::Layout, view, &failure);
        counter.handle_failure(Operation::Layout, view, &failure);
        counter.handle_failure(Operation::Center, view, &failure);

        assert_eq!(counter.count(Operation::Layout), 2);
        assert_eq!(counter.count(Operation::Center), 1);
        assert_eq!(counter.count(Operation::AutoSize), 0);
        assert_eq!(counter.total(), 3);
        assert_eq!(counter.last(), Some((Operation::Center, view)));

        counter.reset();
        assert_eq!(counter.total(), 0);
        assert_eq!(counter.last(), None);
    }
}
