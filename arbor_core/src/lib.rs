// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout coordination for retained-mode view trees.
//!
//! `arbor_core` decides *when* and *in what order* views recompute their
//! preferred sizes, lay out their children, and (for windows) auto-size and
//! center themselves. Views say what needs doing; the coordinator batches
//! the requests, removes duplicates, and runs them later on the UI thread in
//! an order that avoids redundant work.
//!
//! # Architecture
//!
//! ```text
//!   any thread                          UI thread
//!   ──────────                          ─────────
//!   request_sizing_info ─┐
//!   request_layout ──────┼─► PendingRequests ─► need_update ─► MainThreadExecutor::post
//!   request_auto_size ───┤     (dedup sets)      (coalesced)          │
//!   request_center ──────┘                                           ▼
//!                                                     run_pending_updates (one pass)
//!                                                                    │
//!        sizing (child-first, full drain) ─ auto-size ─ layout (one, parent-first) ─ center
//!                         │ work done? reschedule and return ◄───────┘
//! ```
//!
//! **[`view`]** — [`ViewId`] handles and the [`View`] / [`Window`] capability
//! traits. Callbacks receive an [`UpdateCx`] through which they can issue
//! further requests or post deferred work.
//!
//! **[`tree`]** — The [`ViewTree`] contract the coordinator resolves handles
//! and depths through, and [`ViewStore`], a struct-of-arrays arena with
//! generational handles that implements it.
//!
//! **[`pending`]** — The four deduplicating request sets.
//!
//! **[`work`]** — Depth-keyed work items and the child-first / parent-first
//! orderings.
//!
//! **[`coordinator`]** — [`LayoutCoordinator`]: the registry, the coalescing
//! update scheduler, and the phase executor.
//!
//! **[`failure`]** — Per-item containment of callback errors and panics, and
//! the [`FailureHandler`] hook.
//!
//! **[`executor`]** — The [`MainThreadExecutor`] contract and the
//! queue-backed [`QueueExecutor`].
//!
//! **[`config`]** — [`CoordinatorConfig`].
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! pass instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch plus a short sink lock per event).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod coordinator;
pub mod executor;
pub mod failure;
pub mod pending;
pub mod trace;
pub mod tree;
pub mod view;
pub mod work;

pub use config::{CoordinatorConfig, LayoutStrategy};
pub use coordinator::{LayoutCoordinator, LayoutCoordinatorBuilder, PassSummary, UpdatePass};
pub use executor::{MainThreadExecutor, QueueExecutor, Task};
pub use failure::{CallbackFailure, CountFailures, FailureHandler, LogFailures, Operation};
pub use pending::{RequestKind, RequestOutcome};
pub use tree::{TreeError, ViewStore, ViewTree};
pub use view::{BoxError, CallbackResult, UpdateCx, View, ViewId, Window};
