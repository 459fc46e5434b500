// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout coordinator: request registry, update scheduler, and the
//! phase executor.
//!
//! Requests may arrive from any thread. Each one lands in a deduplicating
//! pending set and makes sure exactly one continuation is queued on the
//! [`MainThreadExecutor`]. The continuation runs a *pass*, which works
//! through the phases in priority order:
//!
//! ```text
//!   sizing ──work──▶ reschedule
//!     │ none
//!   auto-size ──work──▶ reschedule
//!     │ none
//!   layout ──work──▶ reschedule
//!     │ none
//!   center ──▶ done
//! ```
//!
//! Rescheduling after every phase that did work lets change notifications
//! queued by the callbacks run before the next phase starts. Those
//! notifications usually add more requests, which are then merged and
//! deduplicated against what is already pending instead of being processed
//! twice.
//!
//! The registry mutex is never held while a view callback runs. The tree
//! lock is only taken through [`ViewTree`] calls, and never while the
//! registry mutex is held.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use core::fmt;

use crate::config::{CoordinatorConfig, LayoutStrategy};
use crate::executor::MainThreadExecutor;
use crate::failure::{CallbackFailure, FailureHandler, LogFailures, Operation};
use crate::pending::{PendingRequests, PendingSet, RequestKind, RequestOutcome};
use crate::trace::{ItemOutcome, SharedSink, Tracer};
use crate::tree::ViewTree;
use crate::view::{CallbackResult, UpdateCx, ViewId};
use crate::work::{self, ChildFirstQueue, WorkItem};

/// What one call to [`LayoutCoordinator::run_pending_updates`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdatePass {
    /// The pass ran. See [`PassSummary`].
    Ran(PassSummary),
    /// A pass was already running further up the stack; nothing was done.
    Reentrant,
    /// The coordinator is torn down; nothing was done.
    TornDown,
    /// Called off the main thread with the check enabled; the pass was
    /// rescheduled onto the executor instead.
    WrongThread,
}

impl UpdatePass {
    /// The summary, if the pass ran.
    #[must_use]
    pub fn summary(&self) -> Option<&PassSummary> {
        match self {
            Self::Ran(summary) => Some(summary),
            _ => None,
        }
    }

    /// The phase that did work, if the pass ran and any phase had work.
    #[must_use]
    pub fn phase(&self) -> Option<RequestKind> {
        self.summary().and_then(|s| s.phase)
    }
}

/// Counters for a pass that ran.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Zero-based pass counter.
    pub pass: u64,
    /// The phase that did work, or `None` if every phase was empty.
    pub phase: Option<RequestKind>,
    /// Callbacks invoked, failed ones included.
    pub processed: usize,
    /// Callbacks whose failure was contained.
    pub failures: usize,
    /// Handles skipped because their view was gone.
    pub stale: usize,
    /// Whether the pass scheduled a follow-up pass.
    pub rescheduled: bool,
}

/// Registry plus the coalescing flag, guarded together.
#[derive(Debug, Default)]
struct State {
    pending: PendingRequests,
    update_scheduled: bool,
}

/// Clears the in-update flag when the pass ends, however it ends.
struct InUpdate<'a>(&'a AtomicBool);

impl Drop for InUpdate<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orders and batches sizing, layout, auto-size and center work for a view
/// tree.
///
/// Create one with [`LayoutCoordinator::new`] or
/// [`LayoutCoordinator::builder`]. The coordinator is always handed out as
/// an `Arc` because queued continuations refer back to it weakly.
pub struct LayoutCoordinator {
    tree: Arc<dyn ViewTree>,
    executor: Arc<dyn MainThreadExecutor>,
    failure_handler: Arc<dyn FailureHandler>,
    config: CoordinatorConfig,
    tracer: Tracer,

    state: Mutex<State>,
    in_update_now: AtomicBool,
    tearing_down: AtomicBool,
    passes: AtomicU64,

    this: Weak<Self>,
}

impl fmt::Debug for LayoutCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutCoordinator")
            .field("config", &self.config)
            .field("in_update_now", &self.in_update_now.load(Ordering::Relaxed))
            .field("torn_down", &self.is_torn_down())
            .field("passes", &self.passes_run())
            .finish_non_exhaustive()
    }
}

/// Configures and creates a [`LayoutCoordinator`].
#[must_use]
pub struct LayoutCoordinatorBuilder {
    tree: Arc<dyn ViewTree>,
    executor: Arc<dyn MainThreadExecutor>,
    config: CoordinatorConfig,
    failure_handler: Option<Arc<dyn FailureHandler>>,
    trace_sink: Option<SharedSink>,
}

impl fmt::Debug for LayoutCoordinatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutCoordinatorBuilder")
            .field("config", &self.config)
            .field("custom_failure_handler", &self.failure_handler.is_some())
            .field("trace_sink", &self.trace_sink.is_some())
            .finish_non_exhaustive()
    }
}

impl LayoutCoordinatorBuilder {
    /// Sets the configuration.
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default [`LogFailures`] handler.
    pub fn failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.failure_handler = Some(handler);
        self
    }

    /// Installs a trace sink. Ignored unless the `trace` feature is enabled.
    pub fn trace_sink(mut self, sink: SharedSink) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// Creates the coordinator.
    #[must_use]
    pub fn build(self) -> Arc<LayoutCoordinator> {
        let Self {
            tree,
            executor,
            config,
            failure_handler,
            trace_sink,
        } = self;
        Arc::new_cyclic(|this| LayoutCoordinator {
            tree,
            executor,
            failure_handler: failure_handler.unwrap_or_else(|| Arc::new(LogFailures)),
            config,
            tracer: Tracer::new(trace_sink),
            state: Mutex::new(State::default()),
            in_update_now: AtomicBool::new(false),
            tearing_down: AtomicBool::new(false),
            passes: AtomicU64::new(0),
            this: this.clone(),
        })
    }
}

impl LayoutCoordinator {
    /// Creates a coordinator with the default configuration and failure
    /// handler.
    #[must_use]
    pub fn new(tree: Arc<dyn ViewTree>, executor: Arc<dyn MainThreadExecutor>) -> Arc<Self> {
        Self::builder(tree, executor).build()
    }

    /// Starts configuring a coordinator.
    pub fn builder(
        tree: Arc<dyn ViewTree>,
        executor: Arc<dyn MainThreadExecutor>,
    ) -> LayoutCoordinatorBuilder {
        LayoutCoordinatorBuilder {
            tree,
            executor,
            config: CoordinatorConfig::new(),
            failure_handler: None,
            trace_sink: None,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Accessors --

    /// The tree views are resolved against.
    #[must_use]
    pub fn tree(&self) -> &dyn ViewTree {
        &*self.tree
    }

    /// The executor continuations are posted to.
    #[must_use]
    pub fn executor(&self) -> &Arc<dyn MainThreadExecutor> {
        &self.executor
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// A strong handle to this coordinator, or `None` while it is being
    /// dropped.
    #[must_use]
    pub fn handle(&self) -> Option<Arc<Self>> {
        self.this.upgrade()
    }

    // -- Requests --

    /// Requests that `view` recompute its sizing info.
    pub fn request_sizing_info(&self, view: ViewId) -> RequestOutcome {
        self.request(RequestKind::Sizing, view)
    }

    /// Requests that `view` lay out its children.
    pub fn request_layout(&self, view: ViewId) -> RequestOutcome {
        self.request(RequestKind::Layout, view)
    }

    /// Requests that `window` resize itself to its content.
    pub fn request_auto_size(&self, window: ViewId) -> RequestOutcome {
        self.request(RequestKind::AutoSize, window)
    }

    /// Requests that `window` center itself.
    pub fn request_center(&self, window: ViewId) -> RequestOutcome {
        self.request(RequestKind::Center, window)
    }

    /// Adds `view` to the `kind` set and makes sure a pass is scheduled.
    ///
    /// Callable from any thread.
    pub fn request(&self, kind: RequestKind, view: ViewId) -> RequestOutcome {
        let outcome = {
            let mut state = self.lock_state();
            // Checked under the lock so a request cannot slip in after
            // teardown cleared the sets.
            if self.is_torn_down() {
                return RequestOutcome::Ignored;
            }
            if state.pending.insert(kind, view) {
                RequestOutcome::Queued
            } else {
                RequestOutcome::AlreadyPending
            }
        };
        tracing::trace!(%kind, %view, ?outcome, "request");
        self.need_update();
        outcome
    }

    // -- Scheduling --

    /// Makes sure a continuation that runs a pass is queued.
    ///
    /// Coalesces: while a continuation is queued and has not started, further
    /// calls do nothing. The continuation is always posted, never run inline,
    /// even on the main thread. Does nothing after teardown.
    pub fn need_update(&self) {
        if self.is_torn_down() {
            return;
        }
        {
            let mut state = self.lock_state();
            if state.update_scheduled {
                return;
            }
            state.update_scheduled = true;
        }

        let next_pass = self.passes.load(Ordering::Relaxed);
        tracing::debug!(next_pass, "update scheduled");
        self.tracer.update_scheduled(next_pass);

        let this = self.this.clone();
        self.executor.post(Box::new(move || {
            if let Some(coordinator) = this.upgrade() {
                coordinator.run_scheduled();
            }
        }));
    }

    fn run_scheduled(&self) {
        self.lock_state().update_scheduled = false;
        if self.is_torn_down() {
            tracing::debug!("continuation skipped after teardown");
            return;
        }
        self.run_pending_updates();
    }

    // -- Lifecycle and queries --

    /// Stops the coordinator.
    ///
    /// Pending requests are discarded, later requests are ignored, and a
    /// continuation that is already queued returns without doing anything.
    /// Called from inside a callback, the running pass stops at the next
    /// item boundary.
    pub fn teardown(&self) {
        if self.tearing_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut state = self.lock_state();
        let dropped: usize = RequestKind::ALL
            .iter()
            .map(|&kind| state.pending.len(kind))
            .sum();
        state.pending.clear();
        tracing::debug!(dropped, "coordinator torn down");
    }

    /// Returns whether [`teardown`](Self::teardown) has been called.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.tearing_down.load(Ordering::Acquire)
    }

    /// Returns whether nothing is pending and no continuation is queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.lock_state();
        state.pending.is_empty() && !state.update_scheduled
    }

    /// Number of pending requests of `kind`.
    #[must_use]
    pub fn pending_len(&self, kind: RequestKind) -> usize {
        self.lock_state().pending.len(kind)
    }

    /// Returns whether `view` has a pending request of `kind`.
    #[must_use]
    pub fn is_pending(&self, kind: RequestKind, view: ViewId) -> bool {
        self.lock_state().pending.contains(kind, view)
    }

    /// Number of passes that have run so far.
    #[must_use]
    pub fn passes_run(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    fn has_unscheduled_work(&self) -> bool {
        if self.is_torn_down() {
            return false;
        }
        let state = self.lock_state();
        !state.pending.is_empty() && !state.update_scheduled
    }

    // -- Phase executor --

    /// Runs one pass over the pending work.
    ///
    /// Normally called by the queued continuation, but may be called directly
    /// on the main thread. A call made while a pass is already running (from
    /// inside a callback, for example) returns [`UpdatePass::Reentrant`]
    /// without doing anything.
    pub fn run_pending_updates(&self) -> UpdatePass {
        if self.is_torn_down() {
            return UpdatePass::TornDown;
        }
        if self.config.check_main_thread && !self.executor.is_main_thread() {
            tracing::error!("layout pass invoked off the main thread; rescheduling");
            self.need_update();
            return UpdatePass::WrongThread;
        }
        if self.in_update_now.swap(true, Ordering::Acquire) {
            tracing::trace!("reentrant pass ignored");
            return UpdatePass::Reentrant;
        }
        let _in_update = InUpdate(&self.in_update_now);

        let pass = self.passes.fetch_add(1, Ordering::Relaxed);
        let _span = tracing::debug_span!("layout_pass", pass).entered();
        self.tracer.pass_begin(pass);

        let mut summary = PassSummary {
            pass,
            ..PassSummary::default()
        };

        let phases: [(RequestKind, fn(&Self, &mut PassSummary) -> usize); 3] = [
            (RequestKind::Sizing, Self::sizing_phase),
            (RequestKind::AutoSize, Self::auto_size_phase),
            (RequestKind::Layout, Self::layout_phase),
        ];
        for (kind, phase) in phases {
            if phase(self, &mut summary) > 0 {
                summary.phase = Some(kind);
                break;
            }
            if self.is_torn_down() {
                break;
            }
        }

        if summary.phase.is_some() {
            if !self.is_torn_down() {
                self.need_update();
                summary.rescheduled = true;
            }
        } else if !self.is_torn_down() && self.center_phase(&mut summary) > 0 {
            summary.phase = Some(RequestKind::Center);
        }
        if !summary.rescheduled && self.has_unscheduled_work() {
            // A callback pumped the executor and the nested continuation
            // found this pass running.
            tracing::debug!("requests left without a continuation; rescheduling");
            self.need_update();
            summary.rescheduled = true;
        }

        tracing::debug!(
            phase = summary.phase.map(RequestKind::as_str),
            processed = summary.processed,
            failures = summary.failures,
            stale = summary.stale,
            rescheduled = summary.rescheduled,
            "pass finished"
        );
        self.tracer.pass_end(pass, summary.rescheduled);
        UpdatePass::Ran(summary)
    }

    /// Full drain, child-first. Requests made while draining are merged in
    /// and deduplicated against the undone items.
    fn sizing_phase(&self, summary: &mut PassSummary) -> usize {
        let kind = RequestKind::Sizing;
        let mut queue = ChildFirstQueue::new();
        let mut processed = 0;
        let mut begun = false;

        while !self.is_torn_down() {
            let fresh = self.lock_state().pending.take(kind);
            if !begun {
                if fresh.is_empty() {
                    return 0;
                }
                self.tracer.phase_begin(summary.pass, kind, fresh.len());
                begun = true;
            }
            queue.merge(self.tree(), fresh);
            let Some(item) = queue.pop() else {
                break;
            };
            if self.run_item(Operation::UpdateSizingInfo, item, summary) {
                processed += 1;
            }
        }

        self.tracer.phase_end(summary.pass, kind, processed);
        processed
    }

    /// Full drain in request order. Windows are top-level, so order between
    /// them does not matter.
    fn auto_size_phase(&self, summary: &mut PassSummary) -> usize {
        self.drain_windows(Operation::AutoSize, summary)
    }

    fn center_phase(&self, summary: &mut PassSummary) -> usize {
        self.drain_windows(Operation::Center, summary)
    }

    fn drain_windows(&self, operation: Operation, summary: &mut PassSummary) -> usize {
        let kind = operation.kind();
        let mut todo = PendingSet::new();
        let mut processed = 0;
        let mut begun = false;

        while !self.is_torn_down() {
            let fresh = self.lock_state().pending.take(kind);
            if !begun {
                if fresh.is_empty() {
                    return 0;
                }
                self.tracer.phase_begin(summary.pass, kind, fresh.len());
                begun = true;
            }
            todo.absorb(fresh);
            let Some(window) = todo.pop_first() else {
                break;
            };
            let item = WorkItem {
                view: window,
                depth: 0,
            };
            if self.run_item(operation, item, summary) {
                processed += 1;
            }
        }

        self.tracer.phase_end(summary.pass, kind, processed);
        processed
    }

    fn layout_phase(&self, summary: &mut PassSummary) -> usize {
        match self.config.layout_strategy {
            LayoutStrategy::OnePerPass => self.layout_one(summary),
            LayoutStrategy::DrainSnapshot => self.layout_snapshot(summary),
        }
    }

    /// Lays out the single shallowest pending view. Depths are recomputed
    /// from the live tree every time.
    fn layout_one(&self, summary: &mut PassSummary) -> usize {
        let kind = RequestKind::Layout;
        let mut candidates = self.lock_state().pending.ids(kind);
        if candidates.is_empty() {
            return 0;
        }
        self.tracer.phase_begin(summary.pass, kind, candidates.len());

        let mut processed = 0;
        while let Some(item) = work::shallowest(self.tree(), &candidates) {
            if self.is_torn_down() {
                break;
            }
            // Only the main thread consumes entries, so it is still present.
            self.lock_state().pending.remove(kind, item.view);
            if self.run_item(Operation::Layout, item, summary) {
                processed = 1;
                break;
            }
            candidates.retain(|&v| v != item.view);
        }

        self.tracer.phase_end(summary.pass, kind, processed);
        processed
    }

    /// Lays out a parent-first snapshot of every pending view.
    fn layout_snapshot(&self, summary: &mut PassSummary) -> usize {
        let kind = RequestKind::Layout;
        let snapshot = self.lock_state().pending.take(kind);
        if snapshot.is_empty() {
            return 0;
        }
        self.tracer.phase_begin(summary.pass, kind, snapshot.len());

        let ids: Vec<ViewId> = snapshot.into_iter().collect();
        let mut processed = 0;
        for item in work::parent_first(self.tree(), &ids) {
            if self.is_torn_down() {
                break;
            }
            if self.run_item(Operation::Layout, item, summary) {
                processed += 1;
            }
        }

        self.tracer.phase_end(summary.pass, kind, processed);
        processed
    }

    /// Resolves and invokes one item with failure containment.
    ///
    /// Returns `false` if the handle was stale and nothing was invoked.
    fn run_item(&self, operation: Operation, item: WorkItem, summary: &mut PassSummary) -> bool {
        let kind = operation.kind();
        let result = match operation {
            Operation::UpdateSizingInfo | Operation::Layout => {
                self.tree.view(item.view).map(|view| {
                    self.contained(item.view, |cx| match operation {
                        Operation::UpdateSizingInfo => view.update_sizing_info(cx),
                        _ => view.layout(cx),
                    })
                })
            }
            Operation::AutoSize | Operation::Center => {
                self.tree.window(item.view).map(|window| {
                    self.contained(item.view, |cx| match operation {
                        Operation::AutoSize => window.auto_size(cx),
                        _ => window.center(cx),
                    })
                })
            }
        };

        let outcome = match result {
            None => {
                tracing::trace!(%kind, view = %item.view, "skipping stale handle");
                summary.stale += 1;
                ItemOutcome::Stale
            }
            Some(Ok(())) => {
                tracing::trace!(%kind, view = %item.view, depth = item.depth, "done");
                summary.processed += 1;
                ItemOutcome::Completed
            }
            Some(Err(failure)) => {
                summary.processed += 1;
                summary.failures += 1;
                self.failure_handler
                    .handle_failure(operation, item.view, &failure);
                ItemOutcome::Failed
            }
        };
        self.tracer
            .item(summary.pass, kind, item.view, item.depth, outcome);
        outcome != ItemOutcome::Stale
    }

    fn contained(
        &self,
        view: ViewId,
        f: impl FnOnce(&mut UpdateCx<'_>) -> CallbackResult,
    ) -> Result<(), CallbackFailure> {
        let mut cx = UpdateCx::new(self, view);
        match panic::catch_unwind(AssertUnwindSafe(|| f(&mut cx))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(CallbackFailure::Error(error)),
            Err(payload) => Err(CallbackFailure::from_panic(payload.as_ref())),
        }
    }
}
