// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordering, batching and containment guarantees of the layout coordinator,
//! driven through recording views.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use arbor_core::{
    CoordinatorConfig, LayoutStrategy, Operation, RequestKind, RequestOutcome, UpdateCx,
    UpdatePass,
};
use arbor_harness::{Call, FailMode, Fixture};

const SIZING: Operation = Operation::UpdateSizingInfo;
const LAYOUT: Operation = Operation::Layout;
const AUTO_SIZE: Operation = Operation::AutoSize;
const CENTER: Operation = Operation::Center;

// -- Coalescing --

#[test]
fn burst_of_requests_posts_one_continuation() {
    let fx = Fixture::new();
    let (w, window) = fx.add_window();
    let (a, view_a) = fx.add_view(w).unwrap();

    for _ in 0..50 {
        fx.coordinator().request_sizing_info(a);
        fx.coordinator().request_layout(a);
    }
    fx.coordinator().request_layout(w);
    fx.coordinator().request_center(w);
    assert_eq!(fx.executor().len(), 1);

    fx.run_until_idle();
    assert_eq!(view_a.calls(SIZING), 1);
    assert_eq!(view_a.calls(LAYOUT), 1);
    assert_eq!(window.calls(LAYOUT), 1);
    assert_eq!(window.calls(CENTER), 1);
    assert!(fx.is_idle());
}

#[test]
fn duplicate_requests_report_already_pending() {
    let fx = Fixture::new();
    let (w, _) = fx.add_window();
    let c = fx.coordinator();
    assert_eq!(c.request_center(w), RequestOutcome::Queued);
    assert_eq!(c.request_center(w), RequestOutcome::AlreadyPending);
    assert_eq!(c.request_layout(w), RequestOutcome::Queued);
    assert_eq!(c.pending_len(RequestKind::Center), 1);
}

#[test]
fn requests_from_many_threads_coalesce() {
    let fx = Fixture::new();
    let (w, _) = fx.add_window();
    let views: Vec<_> = (0..8).map(|_| fx.add_view(w).unwrap()).collect();
    let ids: Vec<_> = views.iter().map(|(id, _)| *id).collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let coordinator = Arc::clone(fx.coordinator());
            let ids = ids.clone();
            thread::spawn(move || {
                for &id in &ids {
                    coordinator.request_sizing_info(id);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(fx.executor().len(), 1);
    assert_eq!(fx.coordinator().pending_len(RequestKind::Sizing), 8);
    fx.run_until_idle();
    for (_, view) in &views {
        assert_eq!(view.calls(SIZING), 1);
    }
}

// -- Sizing --

#[test]
fn sizing_runs_children_before_parents_in_one_pass() {
    let fx = Fixture::new();
    let (w, _) = fx.add_window();
    let (a, _) = fx.add_view(w).unwrap();
    let (b, _) = fx.add_view(a).unwrap();
    let (c, _) = fx.add_view(b).unwrap();

    for id in [w, a, b, c] {
        fx.coordinator().request_sizing_info(id);
    }
    assert!(fx.executor().run_one());

    assert_eq!(fx.log().views_for(SIZING), vec![c, b, a, w]);
    assert_eq!(fx.coordinator().pending_len(RequestKind::Sizing), 0);
    assert_eq!(fx.coordinator().passes_run(), 1);
}

#[test]
fn sizing_request_for_undone_ancestor_is_merged() {
    let fx = Fixture::new();
    let (w, _) = fx.add_window();
    let (a, view_a) = fx.add_view(w).unwrap();
    let (b, view_b) = fx.add_view(a).unwrap();

    view_b.on(SIZING, move |cx: &mut UpdateCx<'_>| {
        cx.request_sizing_info(a);
    });
    fx.coordinator().request_sizing_info(a);
    fx.coordinator().request_sizing_info(b);
    fx.run_until_idle();

    assert_eq!(view_a.calls(SIZING), 1);
    assert_eq!(fx.log().views_for(SIZING), vec![b, a]);
}

#[test]
fn sizing_request_made_mid_phase_runs_in_the_same_pass() {
    let fx = Fixture::new();
    let (w, _) = fx.add_window();
    let (a, view_a) = fx.add_view(w).unwrap();
    let (b, _) = fx.add_view(a).unwrap();

    // `b` is requested after its parent ran and still runs in this pass.
    view_a.on(SIZING, move |cx: &mut UpdateCx<'_>| {
        cx.request_sizing_info(b);
    });
    fx.coordinator().request_sizing_info(a);
    assert!(fx.executor().run_one());

    assert_eq!(fx.log().views_for(SIZING), vec![a, b]);
    assert_eq!(fx.coordinator().passes_run(), 1);
}

// -- Layout --

#[test]
fn parent_layout_precedes_child_and_child_runs_once() {
    let fx = Fixture::new();
    let (p, parent) = fx.add_window();
    let (c, child) = fx.add_view(p).unwrap();

    let renotified = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&renotified);
    parent.on(LAYOUT, move |cx: &mut UpdateCx<'_>| {
        let Some(coordinator) = cx.coordinator_handle() else {
            return;
        };
        let seen = Arc::clone(&seen);
        cx.post(Box::new(move || {
            *seen.lock().unwrap() = Some(coordinator.request_layout(c));
        }));
    });

    fx.coordinator().request_layout(c);
    fx.coordinator().request_layout(p);
    fx.run_until_idle();

    assert_eq!(fx.log().views_for(LAYOUT), vec![p, c]);
    assert_eq!(child.calls(LAYOUT), 1);
    assert_eq!(
        *renotified.lock().unwrap(),
        Some(RequestOutcome::AlreadyPending)
    );
}

#[test]
fn one_layout_per_pass_with_fresh_depths() {
    let fx = Fixture::new();
    let (w, _) = fx.add_window();
    let (a, view_a) = fx.add_view(w).unwrap();
    let (b, _) = fx.add_view(a).unwrap();
    let (c, _) = fx.add_view(w).unwrap();

    // Laying out `a` moves `c` under `b`, so `c` ends up deeper than `b`.
    let store = Arc::clone(fx.store());
    view_a.on(LAYOUT, move |_cx: &mut UpdateCx<'_>| {
        store.reparent(c, b).unwrap();
    });

    fx.coordinator().request_layout(c);
    fx.coordinator().request_layout(b);
    fx.coordinator().request_layout(a);

    assert!(fx.executor().run_one());
    assert_eq!(fx.log().views_for(LAYOUT), vec![a]);
    assert!(fx.executor().run_one());
    // Measured when the request was made, `c` would have come first.
    assert_eq!(fx.log().views_for(LAYOUT), vec![a, b]);
    fx.run_until_idle();
    assert_eq!(fx.log().views_for(LAYOUT), vec![a, b, c]);
    assert_eq!(fx.coordinator().tree().depth(c), 3);
}

#[test]
fn drain_snapshot_lays_out_everything_parent_first() {
    let config = CoordinatorConfig::new().with_layout_strategy(LayoutStrategy::DrainSnapshot);
    let fx = Fixture::with_config(config);
    let (w, _) = fx.add_window();
    let (a, _) = fx.add_view(w).unwrap();
    let (b, _) = fx.add_view(a).unwrap();

    fx.coordinator().request_layout(b);
    fx.coordinator().request_layout(w);
    fx.coordinator().request_layout(a);
    let pass = fx.coordinator().run_pending_updates();

    assert_eq!(pass.phase(), Some(RequestKind::Layout));
    assert_eq!(pass.summary().map(|s| s.processed), Some(3));
    assert_eq!(fx.log().views_for(LAYOUT), vec![w, a, b]);
}

// -- Phase priority --

#[test]
fn phases_run_in_priority_order() {
    let fx = Fixture::new();
    let (w, _) = fx.add_window();
    let (a, _) = fx.add_view(w).unwrap();
    let (b, _) = fx.add_view(a).unwrap();

    fx.coordinator().request_center(w);
    fx.coordinator().request_layout(a);
    fx.coordinator().request_auto_size(w);
    fx.coordinator().request_sizing_info(b);
    fx.run_until_idle();

    assert_eq!(
        fx.log().calls(),
        vec![
            Call::new(b, SIZING),
            Call::new(w, AUTO_SIZE),
            Call::new(a, LAYOUT),
            Call::new(w, CENTER),
        ]
    );
}

#[test]
fn sizing_requested_by_layout_preempts_remaining_layouts() {
    let fx = Fixture::new();
    let (w, _) = fx.add_window();
    let (a, view_a) = fx.add_view(w).unwrap();
    let (b, _) = fx.add_view(a).unwrap();
    let (c, _) = fx.add_view(b).unwrap();

    view_a.on(LAYOUT, move |cx: &mut UpdateCx<'_>| {
        cx.request_sizing_info(b);
    });
    fx.coordinator().request_layout(c);
    fx.coordinator().request_layout(a);
    fx.coordinator().request_center(w);
    fx.run_until_idle();

    assert_eq!(
        fx.log().calls(),
        vec![
            Call::new(a, LAYOUT),
            Call::new(b, SIZING),
            Call::new(c, LAYOUT),
            Call::new(w, CENTER),
        ]
    );
}

#[test]
fn center_waits_for_every_other_phase() {
    let fx = Fixture::new();
    let (w, window) = fx.add_window();
    let (a, view_a) = fx.add_view(w).unwrap();

    // Each layout of `a` asks for one more, three times.
    let remaining = Arc::new(AtomicUsize::new(3));
    let counter = Arc::clone(&remaining);
    view_a.on(LAYOUT, move |cx: &mut UpdateCx<'_>| {
        if counter.fetch_sub(1, Ordering::Relaxed) > 1 {
            let Some(coordinator) = cx.coordinator_handle() else {
                return;
            };
            cx.post(Box::new(move || {
                coordinator.request_layout(a);
            }));
        }
    });
    fx.coordinator().request_center(w);
    fx.coordinator().request_layout(a);
    fx.run_until_idle();

    assert_eq!(view_a.calls(LAYOUT), 3);
    assert_eq!(window.calls(CENTER), 1);
    assert_eq!(fx.log().position(w, CENTER), Some(3));
}

// -- Fault isolation --

#[test]
fn failing_layout_does_not_stop_siblings() {
    let fx = Fixture::new();
    let (w, window) = fx.add_window();
    let (a, view_a) = fx.add_view(w).unwrap();
    let (b, view_b) = fx.add_view(w).unwrap();
    let (c, view_c) = fx.add_view(w).unwrap();
    view_b.fail_on(LAYOUT, FailMode::Error);

    for id in [a, b, c] {
        fx.coordinator().request_layout(id);
    }
    fx.coordinator().request_center(w);
    fx.run_until_idle();

    assert_eq!(view_a.calls(LAYOUT), 1);
    assert_eq!(view_b.calls(LAYOUT), 1);
    assert_eq!(view_c.calls(LAYOUT), 1);
    assert_eq!(window.calls(CENTER), 1);
    assert_eq!(fx.failures().count(LAYOUT), 1);
    assert_eq!(fx.failures().total(), 1);
    assert_eq!(fx.failures().last(), Some((LAYOUT, b)));
}

#[test]
fn panicking_sizing_does_not_stop_the_phase() {
    let fx = Fixture::new();
    let (w, window) = fx.add_window();
    let (a, _) = fx.add_view(w).unwrap();
    let (b, view_b) = fx.add_view(w).unwrap();
    view_b.fail_on(SIZING, FailMode::Panic);

    for id in [a, b, w] {
        fx.coordinator().request_sizing_info(id);
    }
    let pass = fx.coordinator().run_pending_updates();

    let summary = pass.summary().copied().unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failures, 1);
    assert!(summary.rescheduled);
    assert_eq!(window.calls(SIZING), 1);
    assert_eq!(fx.failures().count(SIZING), 1);
    assert_eq!(fx.failures().last(), Some((SIZING, b)));
}

#[test]
fn failing_window_operations_are_contained() {
    let fx = Fixture::new();
    let (w1, first) = fx.add_window();
    let (w2, second) = fx.add_window();
    first.fail_on(AUTO_SIZE, FailMode::Panic);
    first.fail_on(CENTER, FailMode::Error);

    for w in [w1, w2] {
        fx.coordinator().request_auto_size(w);
        fx.coordinator().request_center(w);
    }
    fx.run_until_idle();

    assert_eq!(second.calls(AUTO_SIZE), 1);
    assert_eq!(second.calls(CENTER), 1);
    assert_eq!(first.calls(CENTER), 1);
    assert_eq!(fx.failures().count(AUTO_SIZE), 1);
    assert_eq!(fx.failures().count(CENTER), 1);
    assert!(fx.is_idle());
}

// -- Reentrancy --

#[test]
fn nested_pass_from_callback_is_ignored() {
    let fx = Fixture::new();
    let (w, _) = fx.add_window();
    let (a, view_a) = fx.add_view(w).unwrap();
    let (b, view_b) = fx.add_view(w).unwrap();

    let nested = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&nested);
    view_a.on(SIZING, move |cx: &mut UpdateCx<'_>| {
        record
            .lock()
            .unwrap()
            .push(cx.coordinator().run_pending_updates());
    });

    fx.coordinator().request_sizing_info(a);
    fx.coordinator().request_sizing_info(b);
    fx.run_until_idle();

    assert_eq!(*nested.lock().unwrap(), vec![UpdatePass::Reentrant]);
    assert_eq!(view_a.calls(SIZING), 1);
    assert_eq!(view_b.calls(SIZING), 1);
}

#[test]
fn request_made_while_pumping_inside_center_still_runs() {
    let fx = Fixture::new();
    let (w, window) = fx.add_window();
    let (v, view) = fx.add_view(w).unwrap();

    // A modal loop inside `center` runs the continuation for its own request
    // while the outer pass is still going.
    let executor = Arc::clone(fx.executor());
    window.on(CENTER, move |cx: &mut UpdateCx<'_>| {
        assert_eq!(cx.request_layout(v), RequestOutcome::Queued);
        executor.run_until_idle();
    });

    fx.coordinator().request_center(w);
    fx.run_until_idle();

    assert_eq!(window.calls(CENTER), 1);
    assert_eq!(view.calls(LAYOUT), 1);
    assert_eq!(fx.coordinator().pending_len(RequestKind::Layout), 0);
    assert!(fx.is_idle());
}

#[test]
fn direct_call_consumes_work_before_the_continuation() {
    let fx = Fixture::new();
    let (w, window) = fx.add_window();
    fx.coordinator().request_center(w);

    let pass = fx.coordinator().run_pending_updates();
    assert_eq!(pass.phase(), Some(RequestKind::Center));
    // The queued continuation still runs, but finds nothing to do.
    fx.run_until_idle();
    assert_eq!(window.calls(CENTER), 1);
}

// -- Teardown --

#[test]
fn teardown_discards_pending_and_ignores_new_requests() {
    let fx = Fixture::new();
    let (w, window) = fx.add_window();
    fx.coordinator().request_layout(w);
    fx.coordinator().teardown();

    assert_eq!(fx.coordinator().request_center(w), RequestOutcome::Ignored);
    fx.run_until_idle();
    assert_eq!(window.total_calls(), 0);
    assert_eq!(
        fx.coordinator().run_pending_updates(),
        UpdatePass::TornDown
    );
}

// -- End to end --

#[test]
fn background_requests_produce_the_expected_trace() {
    let fx = Fixture::new();
    let (w, _) = fx.add_window();
    let (a, _) = fx.add_view(w).unwrap();
    let (b, _) = fx.add_view(a).unwrap();

    let coordinator = Arc::clone(fx.coordinator());
    thread::spawn(move || {
        coordinator.request_sizing_info(b);
        coordinator.request_sizing_info(a);
        coordinator.request_layout(w);
        coordinator.request_center(w);
    })
    .join()
    .unwrap();

    assert!(fx.log().is_empty());
    fx.run_until_idle();

    assert_eq!(
        fx.log().calls(),
        vec![
            Call::new(b, SIZING),
            Call::new(a, SIZING),
            Call::new(w, LAYOUT),
            Call::new(w, CENTER),
        ]
    );
    assert!(fx.log().views_for(AUTO_SIZE).is_empty());
    assert_eq!(fx.coordinator().passes_run(), 3);
    assert_eq!(fx.failures().total(), 0);
    assert!(fx.is_idle());
}
