// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real adapter implementations for the drowse daemon
//!
//! The controller drives a Google Compute Engine instance through the
//! `gcloud` CLI; the webhook sink delivers notifications over HTTP. Both
//! implement the traits defined in `drowse-core`.

pub mod gcloud;
pub mod traced;
pub mod webhook;

pub use gcloud::GcloudController;
pub use traced::TracedController;
pub use webhook::{NoopSink, WebhookSink};
