// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Passes and phases become nested duration (`B`/`E`) slices on one track;
//! work items and scheduling are instant events.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        let ts = ns_to_us(recorded.timestamp_ns());
        match recorded {
            RecordedEvent::UpdateScheduled(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "UpdateScheduled",
                    "cat": "Scheduler",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "next_pass": e.next_pass,
                    }
                }));
            }
            RecordedEvent::PassBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": format!("pass {}", e.pass),
                    "cat": "Pass",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                }));
            }
            RecordedEvent::PassEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("pass {}", e.pass),
                    "cat": "Pass",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "rescheduled": e.rescheduled,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.as_str(),
                    "cat": "Phase",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "pass": e.pass,
                        "pending": e.pending,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.as_str(),
                    "cat": "Phase",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "processed": e.processed,
                    }
                }));
            }
            RecordedEvent::Item(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{} {}", e.phase, e.view),
                    "cat": "Item",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "pass": e.pass,
                        "depth": e.depth,
                        "outcome": format!("{:?}", e.outcome),
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ns_to_us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}
