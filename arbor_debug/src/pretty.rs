// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in microseconds since coordinator creation.

use std::io::Write;

use arbor_core::trace::{
    ItemEvent, ItemOutcome, PassBeginEvent, PassEndEvent, PhaseBeginEvent, PhaseEndEvent,
    TraceSink, UpdateScheduledEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
///
/// The sink must be `Send` to be shared with a coordinator, so the default
/// writer is a `Send` trait object.
pub struct PrettyPrintSink<W: Write = Box<dyn Write + Send>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the destination, consuming the sink.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}

fn outcome_name(outcome: ItemOutcome) -> &'static str {
    match outcome {
        ItemOutcome::Completed => "ok",
        ItemOutcome::Failed => "FAILED",
        ItemOutcome::Stale => "stale",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        let _ = writeln!(
            self.writer,
            "[schedule] next_pass={} at {:.1}µs",
            e.next_pass,
            us(e.timestamp_ns),
        );
    }

    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[pass:begin] pass={} at {:.1}µs",
            e.pass,
            us(e.timestamp_ns),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] pass={} {} pending={} at {:.1}µs",
            e.pass,
            e.phase,
            e.pending,
            us(e.timestamp_ns),
        );
    }

    fn on_item(&mut self, e: &ItemEvent) {
        let _ = writeln!(
            self.writer,
            "[item] pass={} {} {} depth={} {}",
            e.pass,
            e.phase,
            e.view,
            e.depth,
            outcome_name(e.outcome),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] pass={} {} processed={} at {:.1}µs",
            e.pass,
            e.phase,
            e.processed,
            us(e.timestamp_ns),
        );
    }

    fn on_pass_end(&mut self, e: &PassEndEvent) {
        let next = if e.rescheduled { "rescheduled" } else { "idle" };
        let _ = writeln!(
            self.writer,
            "[pass:end] pass={} {next} at {:.1}µs",
            e.pass,
            us(e.timestamp_ns),
        );
    }
}
