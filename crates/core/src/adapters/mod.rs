// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter traits for the capabilities the state manager consumes

pub mod fake;
pub mod traits;

// Re-export traits
pub use traits::{ClientHandle, ControlError, NotificationSink, ResourceController, SinkError};

// Re-export fake adapters
pub use fake::{ClientEvent, ControllerCall, FakeClient, FakeController, FakeSink};
