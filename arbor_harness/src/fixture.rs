// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A ready-made store, executor and coordinator for tests.

use std::sync::Arc;

use arbor_core::config::CoordinatorConfig;
use arbor_core::coordinator::LayoutCoordinator;
use arbor_core::executor::{MainThreadExecutor, QueueExecutor};
use arbor_core::failure::{CountFailures, FailureHandler};
use arbor_core::trace::SharedSink;
use arbor_core::tree::{TreeError, ViewStore, ViewTree};
use arbor_core::view::{View, ViewId, Window};

use crate::boxes::attach;
use crate::log::CallLog;
use crate::recording::RecordingView;

/// Owns everything a coordinator needs, wired together.
///
/// Must be created on the thread that will pump it: that thread becomes the
/// executor's UI thread. Failures are counted by a [`CountFailures`] handler
/// instead of being logged.
#[derive(Debug)]
pub struct Fixture {
    store: Arc<ViewStore>,
    executor: Arc<QueueExecutor>,
    failures: Arc<CountFailures>,
    coordinator: Arc<LayoutCoordinator>,
    log: CallLog,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Creates a fixture with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(CoordinatorConfig::new(), None)
    }

    /// Creates a fixture with `config`.
    #[must_use]
    pub fn with_config(config: CoordinatorConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a fixture with `config` whose coordinator reports to `sink`.
    ///
    /// Events only reach the sink when `arbor_core` is built with the
    /// `trace` feature.
    #[must_use]
    pub fn with_trace_sink(config: CoordinatorConfig, sink: SharedSink) -> Self {
        Self::build(config, Some(sink))
    }

    fn build(config: CoordinatorConfig, sink: Option<SharedSink>) -> Self {
        let store = Arc::new(ViewStore::new());
        let executor = Arc::new(QueueExecutor::new());
        let failures = Arc::new(CountFailures::new());
        let mut builder = LayoutCoordinator::builder(
            Arc::clone(&store) as Arc<dyn ViewTree>,
            Arc::clone(&executor) as Arc<dyn MainThreadExecutor>,
        )
        .config(config)
        .failure_handler(Arc::clone(&failures) as Arc<dyn FailureHandler>);
        if let Some(sink) = sink {
            builder = builder.trace_sink(sink);
        }
        Self {
            store,
            executor,
            failures,
            coordinator: builder.build(),
            log: CallLog::new(),
        }
    }

    /// The view store.
    #[must_use]
    pub fn store(&self) -> &Arc<ViewStore> {
        &self.store
    }

    /// The executor the coordinator posts to.
    #[must_use]
    pub fn executor(&self) -> &Arc<QueueExecutor> {
        &self.executor
    }

    /// The coordinator under test.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<LayoutCoordinator> {
        &self.coordinator
    }

    /// The failure counts.
    #[must_use]
    pub fn failures(&self) -> &CountFailures {
        &self.failures
    }

    /// The log every view made by this fixture records into.
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Adds a recording top-level window.
    pub fn add_window(&self) -> (ViewId, Arc<RecordingView>) {
        let view = Arc::new(RecordingView::new(self.log.clone()));
        let id = self
            .store
            .insert_window(Arc::clone(&view) as Arc<dyn Window>);
        (id, view)
    }

    /// Adds a detached recording view that is not a window.
    pub fn add_root(&self) -> (ViewId, Arc<RecordingView>) {
        let view = Arc::new(RecordingView::new(self.log.clone()));
        let id = self.store.insert_view(Arc::clone(&view) as Arc<dyn View>);
        (id, view)
    }

    /// Adds a recording view as the last child of `parent`.
    pub fn add_view(&self, parent: ViewId) -> Result<(ViewId, Arc<RecordingView>), TreeError> {
        let (id, view) = self.add_root();
        attach(&self.store, parent, id)?;
        Ok((id, view))
    }

    /// Runs queued tasks until none are left and returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        self.executor.run_until_idle()
    }

    /// Returns whether no task is queued and nothing is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.executor.is_empty() && self.coordinator.is_idle()
    }
}
