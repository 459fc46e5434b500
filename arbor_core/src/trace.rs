// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instrumentation for coordinator passes.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! coordinator calls as it schedules and runs passes. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional shared sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch and, if a sink is installed,
//! locks it for the duration of one event. The sink lock is never held while
//! a view callback runs.
//!
//! Timestamps are nanoseconds since the coordinator was created.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies.

use std::sync::{Arc, Mutex};

use crate::pending::RequestKind;
use crate::view::ViewId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a single work item ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemOutcome {
    /// The callback returned `Ok`.
    Completed,
    /// The callback returned an error or panicked; the failure was contained.
    Failed,
    /// The handle no longer resolved to a live view; nothing was invoked.
    Stale,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a continuation is posted to the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateScheduledEvent {
    /// Index the scheduled pass will get when it runs.
    pub next_pass: u64,
    /// Nanoseconds since coordinator creation.
    pub timestamp_ns: u64,
}

/// Marks the beginning of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassBeginEvent {
    /// Pass counter.
    pub pass: u64,
    /// Nanoseconds since coordinator creation.
    pub timestamp_ns: u64,
}

/// Marks the beginning of a phase that has work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseBeginEvent {
    /// Pass counter.
    pub pass: u64,
    /// Which phase is starting.
    pub phase: RequestKind,
    /// Pending entries when the phase started.
    pub pending: usize,
    /// Nanoseconds since coordinator creation.
    pub timestamp_ns: u64,
}

/// Emitted after each work item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemEvent {
    /// Pass counter.
    pub pass: u64,
    /// Phase the item belongs to.
    pub phase: RequestKind,
    /// The view the item was for.
    pub view: ViewId,
    /// Depth computed when the item was selected (0 for window phases).
    pub depth: usize,
    /// How the item ended.
    pub outcome: ItemOutcome,
    /// Nanoseconds since coordinator creation.
    pub timestamp_ns: u64,
}

/// Marks the end of a phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseEndEvent {
    /// Pass counter.
    pub pass: u64,
    /// Which phase is ending.
    pub phase: RequestKind,
    /// Callbacks invoked during the phase (failures included).
    pub processed: usize,
    /// Nanoseconds since coordinator creation.
    pub timestamp_ns: u64,
}

/// Marks the end of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassEndEvent {
    /// Pass counter.
    pub pass: u64,
    /// Whether the pass scheduled a follow-up.
    pub rescheduled: bool,
    /// Nanoseconds since coordinator creation.
    pub timestamp_ns: u64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the coordinator.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a continuation is posted.
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        _ = e;
    }

    /// Called at the beginning of a pass.
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase with pending work.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called after each work item.
    fn on_item(&mut self, e: &ItemEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called at the end of a pass.
    fn on_pass_end(&mut self, e: &PassEndEvent) {
        _ = e;
    }
}

/// A sink shared between the coordinator and whoever reads it back.
pub type SharedSink = Arc<Mutex<dyn TraceSink + Send>>;

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`SharedSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing and
/// the sink passed to [`new`](Self::new) is dropped.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<SharedSink>,
    #[cfg(feature = "trace")]
    epoch: std::time::Instant,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(feature = "trace")]
macro_rules! dispatch {
    ($self:ident, $method:ident, $event:expr) => {
        if let Some(sink) = &$self.sink {
            let event = $event;
            sink.lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .$method(&event);
        }
    };
}

impl Tracer {
    /// Creates a tracer that dispatches to `sink`, if any.
    #[inline]
    #[must_use]
    pub fn new(sink: Option<SharedSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self {
                sink,
                epoch: std::time::Instant::now(),
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::new(None)
    }

    /// Returns whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    #[cfg(feature = "trace")]
    fn now_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Emits an [`UpdateScheduledEvent`].
    #[inline]
    pub fn update_scheduled(&self, next_pass: u64) {
        #[cfg(feature = "trace")]
        dispatch!(
            self,
            on_update_scheduled,
            UpdateScheduledEvent {
                next_pass,
                timestamp_ns: self.now_ns(),
            }
        );
        #[cfg(not(feature = "trace"))]
        {
            _ = next_pass;
        }
    }

    /// Emits a [`PassBeginEvent`].
    #[inline]
    pub fn pass_begin(&self, pass: u64) {
        #[cfg(feature = "trace")]
        dispatch!(
            self,
            on_pass_begin,
            PassBeginEvent {
                pass,
                timestamp_ns: self.now_ns(),
            }
        );
        #[cfg(not(feature = "trace"))]
        {
            _ = pass;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&self, pass: u64, phase: RequestKind, pending: usize) {
        #[cfg(feature = "trace")]
        dispatch!(
            self,
            on_phase_begin,
            PhaseBeginEvent {
                pass,
                phase,
                pending,
                timestamp_ns: self.now_ns(),
            }
        );
        #[cfg(not(feature = "trace"))]
        {
            _ = (pass, phase, pending);
        }
    }

    /// Emits an [`ItemEvent`].
    #[inline]
    pub fn item(
        &self,
        pass: u64,
        phase: RequestKind,
        view: ViewId,
        depth: usize,
        outcome: ItemOutcome,
    ) {
        #[cfg(feature = "trace")]
        dispatch!(
            self,
            on_item,
            ItemEvent {
                pass,
                phase,
                view,
                depth,
                outcome,
                timestamp_ns: self.now_ns(),
            }
        );
        #[cfg(not(feature = "trace"))]
        {
            _ = (pass, phase, view, depth, outcome);
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&self, pass: u64, phase: RequestKind, processed: usize) {
        #[cfg(feature = "trace")]
        dispatch!(
            self,
            on_phase_end,
            PhaseEndEvent {
                pass,
                phase,
                processed,
                timestamp_ns: self.now_ns(),
            }
        );
        #[cfg(not(feature = "trace"))]
        {
            _ = (pass, phase, processed);
        }
    }

    /// Emits a [`PassEndEvent`].
    #[inline]
    pub fn pass_end(&self, pass: u64, rescheduled: bool) {
        #[cfg(feature = "trace")]
        dispatch!(
            self,
            on_pass_end,
            PassEndEvent {
                pass,
                rescheduled,
                timestamp_ns: self.now_ns(),
            }
        );
        #[cfg(not(feature = "trace"))]
        {
            _ = (pass, rescheduled);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
