// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Counts and depths are stored as `u32` and saturate.

use arbor_core::pending::RequestKind;
use arbor_core::trace::{
    ItemEvent, ItemOutcome, PassBeginEvent, PassEndEvent, PhaseBeginEvent, PhaseEndEvent,
    TraceSink, UpdateScheduledEvent,
};
use arbor_core::view::ViewId;

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_UPDATE_SCHEDULED: u8 = 1;
const TAG_PASS_BEGIN: u8 = 2;
const TAG_PHASE_BEGIN: u8 = 3;
const TAG_ITEM: u8 = 4;
const TAG_PHASE_END: u8 = 5;
const TAG_PASS_END: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, v: usize) {
        self.write_u32(u32::try_from(v).unwrap_or(u32::MAX));
    }

    fn write_phase(&mut self, p: RequestKind) {
        self.write_u8(match p {
            RequestKind::Sizing => 0,
            RequestKind::AutoSize => 1,
            RequestKind::Layout => 2,
            RequestKind::Center => 3,
        });
    }

    fn write_outcome(&mut self, o: ItemOutcome) {
        self.write_u8(match o {
            ItemOutcome::Completed => 0,
            ItemOutcome::Failed => 1,
            ItemOutcome::Stale => 2,
        });
    }

    fn write_view(&mut self, v: ViewId) {
        self.write_u32(v.index());
        self.write_u32(v.generation());
    }
}

impl TraceSink for RecorderSink {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        self.write_u8(TAG_UPDATE_SCHEDULED);
        self.write_u64(e.next_pass);
        self.write_u64(e.timestamp_ns);
    }

    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        self.write_u8(TAG_PASS_BEGIN);
        self.write_u64(e.pass);
        self.write_u64(e.timestamp_ns);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.pass);
        self.write_phase(e.phase);
        self.write_count(e.pending);
        self.write_u64(e.timestamp_ns);
    }

    fn on_item(&mut self, e: &ItemEvent) {
        self.write_u8(TAG_ITEM);
        self.write_u64(e.pass);
        self.write_phase(e.phase);
        self.write_view(e.view);
        self.write_count(e.depth);
        self.write_outcome(e.outcome);
        self.write_u64(e.timestamp_ns);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.pass);
        self.write_phase(e.phase);
        self.write_count(e.processed);
        self.write_u64(e.timestamp_ns);
    }

    fn on_pass_end(&mut self, e: &PassEndEvent) {
        self.write_u8(TAG_PASS_END);
        self.write_u64(e.pass);
        self.write_u8(u8::from(e.rescheduled));
        self.write_u64(e.timestamp_ns);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// An [`UpdateScheduledEvent`].
    UpdateScheduled(UpdateScheduledEvent),
    /// A [`PassBeginEvent`].
    PassBegin(PassBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// An [`ItemEvent`].
    Item(ItemEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`PassEndEvent`].
    PassEnd(PassEndEvent),
}

impl RecordedEvent {
    /// Nanoseconds since coordinator creation.
    #[must_use]
    pub fn timestamp_ns(&self) -> u64 {
        match self {
            Self::UpdateScheduled(e) => e.timestamp_ns,
            Self::PassBegin(e) => e.timestamp_ns,
            Self::PhaseBegin(e) => e.timestamp_ns,
            Self::Item(e) => e.timestamp_ns,
            Self::PhaseEnd(e) => e.timestamp_ns,
            Self::PassEnd(e) => e.timestamp_ns,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
///
/// Stops at the first unknown tag or truncated record.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes: [u8; N] = self.data.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_count(&mut self) -> Option<usize> {
        usize::try_from(self.read_u32()?).ok()
    }

    fn read_phase(&mut self) -> Option<RequestKind> {
        Some(match self.read_u8()? {
            0 => RequestKind::Sizing,
            1 => RequestKind::AutoSize,
            2 => RequestKind::Layout,
            _ => RequestKind::Center,
        })
    }

    fn read_outcome(&mut self) -> Option<ItemOutcome> {
        Some(match self.read_u8()? {
            0 => ItemOutcome::Completed,
            1 => ItemOutcome::Failed,
            _ => ItemOutcome::Stale,
        })
    }

    fn read_view(&mut self) -> Option<ViewId> {
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(ViewId::from_raw_parts(index, generation))
    }

    fn decode_update_scheduled(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::UpdateScheduled(UpdateScheduledEvent {
            next_pass: self.read_u64()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_pass_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PassBegin(PassBeginEvent {
            pass: self.read_u64()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            pass: self.read_u64()?,
            phase: self.read_phase()?,
            pending: self.read_count()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_item(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Item(ItemEvent {
            pass: self.read_u64()?,
            phase: self.read_phase()?,
            view: self.read_view()?,
            depth: self.read_count()?,
            outcome: self.read_outcome()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            pass: self.read_u64()?,
            phase: self.read_phase()?,
            processed: self.read_count()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_pass_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PassEnd(PassEndEvent {
            pass: self.read_u64()?,
            rescheduled: self.read_u8()? != 0,
            timestamp_ns: self.read_u64()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_UPDATE_SCHEDULED => self.decode_update_scheduled(),
            TAG_PASS_BEGIN => self.decode_pass_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_ITEM => self.decode_item(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_PASS_END => self.decode_pass_end(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> ItemEvent {
        ItemEvent {
            pass: 3,
            phase: RequestKind::Layout,
            view: ViewId::from_raw_parts(12, 2),
            depth: 4,
            outcome: ItemOutcome::Failed,
            timestamp_ns: 9_000,
        }
    }

    #[test]
    fn item_survives_recording() {
        let mut rec = RecorderSink::new();
        let orig = sample_item();
        rec.on_item(&orig);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events, vec![RecordedEvent::Item(orig)]);
    }

    #[test]
    fn full_pass_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_update_scheduled(&UpdateScheduledEvent {
            next_pass: 0,
            timestamp_ns: 10,
        });
        rec.on_pass_begin(&PassBeginEvent {
            pass: 0,
            timestamp_ns: 20,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            pass: 0,
            phase: RequestKind::Sizing,
            pending: 2,
            timestamp_ns: 21,
        });
        rec.on_item(&sample_item());
        rec.on_phase_end(&PhaseEndEvent {
            pass: 0,
            phase: RequestKind::Sizing,
            processed: 2,
            timestamp_ns: 40,
        });
        rec.on_pass_end(&PassEndEvent {
            pass: 0,
            rescheduled: true,
            timestamp_ns: 41,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], RecordedEvent::UpdateScheduled(_)));
        assert!(matches!(events[1], RecordedEvent::PassBegin(_)));
        match &events[2] {
            RecordedEvent::PhaseBegin(e) => {
                assert_eq!(e.phase, RequestKind::Sizing);
                assert_eq!(e.pending, 2);
            }
            other => panic!("expected PhaseBegin, got {other:?}"),
        }
        assert!(matches!(events[3], RecordedEvent::Item(_)));
        assert!(matches!(events[4], RecordedEvent::PhaseEnd(_)));
        match &events[5] {
            RecordedEvent::PassEnd(e) => assert!(e.rescheduled),
            other => panic!("expected PassEnd, got {other:?}"),
        }
        let stamps: Vec<u64> = events.iter().map(RecordedEvent::timestamp_ns).collect();
        assert_eq!(stamps, vec![10, 20, 21, 9_000, 40, 41]);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn truncated_record_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_pass_begin(&PassBeginEvent {
            pass: 1,
            timestamp_ns: 5,
        });
        rec.on_item(&sample_item());
        let bytes = rec.into_bytes();

        let events: Vec<_> = decode(&bytes[..bytes.len() - 3]).collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RecordedEvent::PassBegin(_)));
    }

    #[test]
    fn oversized_counts_saturate() {
        let mut rec = RecorderSink::new();
        rec.on_phase_end(&PhaseEndEvent {
            pass: 0,
            phase: RequestKind::Center,
            processed: usize::MAX,
            timestamp_ns: 0,
        });
        match decode(rec.as_bytes()).next() {
            Some(RecordedEvent::PhaseEnd(e)) => assert_eq!(e.processed, u32::MAX as usize),
            other => panic!("expected PhaseEnd, got {other:?}"),
        }
    }
}
