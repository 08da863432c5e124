// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trait definitions for the resource backend, notification delivery, and
//! queued proxy clients

use crate::state::ResourceState;
use async_trait::async_trait;
use thiserror::Error;

// =============================================================================
// Resource controller
// =============================================================================

/// Errors from resource control operations
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("no machine status observed yet: {0}")]
    NoStatus(String),
    #[error("command failed: {cmd} - {stderr}")]
    CommandFailed { cmd: String, stderr: String },
    #[error("operation error: {0}")]
    Operation(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Adapter for the machine backing the target server.
///
/// Implementations talk to whatever actually hosts the server (a cloud
/// instance in production, a scripted double in tests) and are injected into
/// the state manager at construction.
#[async_trait]
pub trait ResourceController: Clone + Send + Sync + 'static {
    /// Report the current machine state.
    ///
    /// Must not block indefinitely. On transient failure an implementation
    /// may serve the last successfully observed state, but it must fail when
    /// nothing has been observed yet so that a broken deployment is caught at
    /// startup instead of being reported as some made-up state.
    async fn check_state(&self) -> Result<ResourceState, ControlError>;

    /// Start the machine back up.
    ///
    /// Blocks until the request is accepted, not until the machine is
    /// observably running; the caller confirms the transition by polling
    /// [`check_state`](Self::check_state).
    async fn resume(&self) -> Result<(), ControlError>;

    /// Suspend the machine, preserving its disk state.
    async fn suspend(&self) -> Result<(), ControlError>;
}

// =============================================================================
// Notification sink
// =============================================================================

/// Errors from notification delivery
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("notification failed: {0}")]
    Failed(String),
    #[error("unexpected response: {0}")]
    Http(String),
}

/// Adapter for outbound event notifications.
///
/// Delivery is best-effort; callers log failures and move on.
#[async_trait]
pub trait NotificationSink: Clone + Send + Sync + 'static {
    /// Deliver one textual event description
    async fn deliver(&self, text: &str) -> Result<(), SinkError>;
}

// =============================================================================
// Client handle
// =============================================================================

/// A proxy client waiting for the target server.
///
/// The handle is consumed when a verdict is delivered: the client is either
/// sent through to the server or turned away with a message, never both.
pub trait ClientHandle: Send + 'static {
    /// Display name used in notifications, when known
    fn name(&self) -> Option<String>;

    /// Send the client to the target server
    fn connect(self, target: &str);

    /// Turn the client away with an explanatory message
    fn disconnect(self, reason: &str);
}
