// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! drowse-core: state management for the drowse auto-suspend daemon
//!
//! This crate provides:
//! - The resource state machine and control loop (`StateManager`)
//! - Connection queue and keep-alive window bookkeeping
//! - Adapter traits for the resource backend and notification delivery
//! - Notification message rendering and asynchronous dispatch

pub mod clock;

pub mod adapters;

// State machine pieces (order matters for dependencies)
pub mod state;
pub mod keepalive;
pub mod queue;
pub mod notify;
pub mod manager;

pub mod config;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError, GceConfig, WebhookConfig};
pub use keepalive::KeepAlive;
pub use manager::{ManagerConfig, StateManager};
pub use notify::{notify_channel, Dispatcher, NotificationEvent, NotifyHandle, Outbound};
pub use queue::ConnectionQueue;
pub use state::ResourceState;

// Re-export adapter traits and fakes
pub use adapters::{
    ClientHandle, ControlError, FakeController, FakeSink, NotificationSink, ResourceController,
    SinkError,
};
