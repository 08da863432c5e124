// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced controller wrapper for consistent observability

use async_trait::async_trait;
use drowse_core::{ControlError, ResourceController, ResourceState};

/// Wrapper that adds tracing to any ResourceController
#[derive(Clone)]
pub struct TracedController<R> {
    inner: R,
}

impl<R> TracedController<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: ResourceController> ResourceController for TracedController<R> {
    async fn check_state(&self) -> Result<ResourceState, ControlError> {
        let result = self.inner.check_state().await;
        tracing::trace!(state = ?result.as_ref().ok(), "checked");
        result
    }

    async fn resume(&self) -> Result<(), ControlError> {
        tracing::info!("resume requested");
        let start = std::time::Instant::now();
        let result = self.inner.resume().await;
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "resume accepted"
            ),
            Err(e) => tracing::error!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "resume failed"
            ),
        }

        result
    }

    async fn suspend(&self) -> Result<(), ControlError> {
        tracing::info!("suspend requested");
        let start = std::time::Instant::now();
        let result = self.inner.suspend().await;
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "suspend accepted"
            ),
            Err(e) => tracing::error!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "suspend failed"
            ),
        }

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
