// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A window of stacked boxes settling its geometry under the coordinator.
//!
//! Requests are issued from a background thread, then the main thread pumps
//! the executor until the tree is idle. Pass events go to both a
//! [`PrettyPrintSink`] on stdout and a [`RecorderSink`], which is exported
//! as a Chrome trace at the end. Set `RUST_LOG` (for example
//! `RUST_LOG=arbor_core=trace`) to see the coordinator's own log lines.

use std::fs::File;
use std::io::BufWriter;
use std::sync::{Arc, Mutex};
use std::thread;

use arbor_core::trace::{
    ItemEvent, PassBeginEvent, PassEndEvent, PhaseBeginEvent, PhaseEndEvent, SharedSink,
    TraceSink, UpdateScheduledEvent,
};
use arbor_core::{CoordinatorConfig, Window};
use arbor_debug::pretty::PrettyPrintSink;
use arbor_debug::recorder::RecorderSink;
use arbor_harness::{BoxNode, BoxView, Fixture, FrameWindow, StackView};
use kurbo::{Rect, Size};
use tracing_subscriber::EnvFilter;

/// Forwards every event to a pretty printer and a shared recorder.
struct Tee {
    pretty: PrettyPrintSink,
    recorder: Arc<Mutex<RecorderSink>>,
}

impl Tee {
    fn both(&mut self, emit: impl Fn(&mut dyn TraceSink)) {
        emit(&mut self.pretty);
        emit(&mut *self.recorder.lock().expect("recorder lock poisoned"));
    }
}

impl TraceSink for Tee {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        self.both(|sink| sink.on_update_scheduled(e));
    }

    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        self.both(|sink| sink.on_pass_begin(e));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.both(|sink| sink.on_phase_begin(e));
    }

    fn on_item(&mut self, e: &ItemEvent) {
        self.both(|sink| sink.on_item(e));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.both(|sink| sink.on_phase_end(e));
    }

    fn on_pass_end(&mut self, e: &PassEndEvent) {
        self.both(|sink| sink.on_pass_end(e));
    }
}

const LEAVES: [(f64, f64); 3] = [(120.0, 24.0), (200.0, 40.0), (90.0, 24.0)];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // -- sinks -------------------------------------------------------------
    let recorder = Arc::new(Mutex::new(RecorderSink::new()));
    let tee = Tee {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout())),
        recorder: Arc::clone(&recorder),
    };
    let sink: SharedSink = Arc::new(Mutex::new(tee));

    // -- tree --------------------------------------------------------------
    let fx = Fixture::with_trace_sink(CoordinatorConfig::new(), sink);
    let store = fx.store();
    let window = Arc::new(FrameWindow::new(Rect::new(0.0, 0.0, 1280.0, 800.0)));
    let w = store.insert_window(Arc::clone(&window) as Arc<dyn Window>);
    let stack = Arc::new(StackView::new(8.0));
    let s = window
        .set_content(store, w, Arc::clone(&stack))
        .expect("window accepts content");
    let leaves: Vec<_> = LEAVES
        .iter()
        .map(|&(width, height)| {
            stack
                .push(store, s, Arc::new(BoxView::new(Size::new(width, height))))
                .expect("stack accepts children")
        })
        .collect();

    // -- requests from a worker --------------------------------------------
    let coordinator = Arc::clone(fx.coordinator());
    thread::spawn(move || {
        for leaf in leaves {
            coordinator.request_sizing_info(leaf);
        }
        coordinator.request_center(w);
    })
    .join()
    .expect("request thread panicked");

    // -- pump --------------------------------------------------------------
    let tasks = fx.run_until_idle();
    let frame = window.frame();
    println!(
        "Settled after {} passes ({tasks} tasks): window at ({}, {}) size {}x{}",
        fx.coordinator().passes_run(),
        frame.x0,
        frame.y0,
        frame.width(),
        frame.height(),
    );

    // -- export Chrome trace -----------------------------------------------
    let path = "layout_trace.json";
    let file = File::create(path).expect("failed to create layout_trace.json");
    let mut writer = BufWriter::new(file);
    let bytes = recorder
        .lock()
        .expect("recorder lock poisoned")
        .as_bytes()
        .to_vec();
    arbor_debug::chrome::export(&bytes, &mut writer).expect("failed to write Chrome trace");
    println!("Wrote {path}");
}
