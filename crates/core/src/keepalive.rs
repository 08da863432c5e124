// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keep-alive window: an operator override that blocks idle suspension

use std::time::{Duration, Instant};

/// An operator-requested window during which the server must stay up.
///
/// The window is effective while its expiry is strictly in the future;
/// `Forever` never expires and must be cancelled explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAlive {
    Until(Instant),
    Forever,
}

impl KeepAlive {
    pub fn effective(&self, now: Instant) -> bool {
        match self {
            KeepAlive::Until(expiry) => *expiry > now,
            KeepAlive::Forever => true,
        }
    }

    /// Time left in the window, `None` when unbounded.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self {
            KeepAlive::Until(expiry) => Some(expiry.saturating_duration_since(now)),
            KeepAlive::Forever => None,
        }
    }
}
