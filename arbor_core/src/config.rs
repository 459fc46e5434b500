// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinator configuration.

/// How the layout phase consumes its pending set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayoutStrategy {
    /// Lay out only the shallowest pending view, then reschedule.
    ///
    /// Depths are recomputed on every pass, so queued notifications from a
    /// parent's layout are handled before any child is laid out. A child that
    /// the parent's layout re-requests is still laid out only once.
    #[default]
    OnePerPass,
    /// Snapshot the whole layout set, sort it parent-first, and lay out every
    /// item in one pass, then reschedule.
    ///
    /// Fewer passes, but a child can be laid out twice when its parent's
    /// layout triggers a notification that re-requests it.
    DrainSnapshot,
}

/// Tunables for a [`LayoutCoordinator`](crate::LayoutCoordinator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Layout phase behavior.
    pub layout_strategy: LayoutStrategy,
    /// When set, a pass invoked off the executor's main thread logs an error
    /// and reschedules itself instead of running any view callback.
    pub check_main_thread: bool,
}

impl CoordinatorConfig {
    /// The default configuration: one layout per pass, main-thread checks on.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            layout_strategy: LayoutStrategy::OnePerPass,
            check_main_thread: true,
        }
    }

    /// Returns a copy with the given layout strategy.
    #[must_use]
    pub const fn with_layout_strategy(mut self, strategy: LayoutStrategy) -> Self {
        self.layout_strategy = strategy;
        self
    }

    /// Returns a copy with main-thread checks enabled or disabled.
    #[must_use]
    pub const fn with_main_thread_check(mut self, check: bool) -> Self {
        self.check_main_thread = check;
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.layout_strategy, LayoutStrategy::OnePerPass);
        assert!(config.check_main_thread);
        assert_eq!(config, CoordinatorConfig::new());
    }

    #[test]
    fn const_builders() {
        const DRAIN: CoordinatorConfig = CoordinatorConfig::new()
            .with_layout_strategy(LayoutStrategy::DrainSnapshot)
            .with_main_thread_check(false);
        assert_eq!(DRAIN.layout_strategy, LayoutStrategy::DrainSnapshot);
        assert!(!DRAIN.check_main_thread);
    }
}
