// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles and fixtures for exercising `arbor_core`.
//!
//! - [`log`]: [`CallLog`], an ordered record of callbacks shared by many
//!   views.
//! - [`recording`]: [`RecordingView`], a view and window whose callbacks can
//!   be scripted to fail or to issue requests mid-pass.
//! - [`boxes`]: box-layout views with real [`kurbo`] geometry that notify
//!   each other through posted change notifications.
//! - [`fixture`]: [`Fixture`], a store, queue executor and coordinator wired
//!   together on the current thread.

pub mod boxes;
pub mod fixture;
pub mod log;
pub mod recording;

pub use boxes::{BoxNode, BoxView, FrameWindow, Geometry, GeometryCell, StackView};
pub use fixture::Fixture;
pub use log::{Call, CallLog};
pub use recording::{FailMode, Hook, InjectedFailure, RecordingView};
