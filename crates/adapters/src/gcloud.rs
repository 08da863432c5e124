// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Google Compute Engine controller driven through the `gcloud` CLI

use async_trait::async_trait;
use drowse_core::{ControlError, GceConfig, ResourceController, ResourceState};
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Controller for a single compute instance.
///
/// Status queries fall back to the last successfully observed state when the
/// CLI fails, so a flaky network does not flap the state machine. No fallback
/// exists before the first observation; [`connect`](Self::connect) performs
/// that observation so a misconfigured deployment fails at startup.
#[derive(Clone)]
pub struct GcloudController {
    config: GceConfig,
    last_state: Arc<Mutex<Option<ResourceState>>>,
}

impl GcloudController {
    /// Build a controller and probe the instance once
    pub async fn connect(config: GceConfig) -> Result<Self, ControlError> {
        let controller = Self {
            config,
            last_state: Arc::new(Mutex::new(None)),
        };
        let state = controller.fetch_status().await?;
        controller.remember(state);
        info!(
            instance = %controller.config.instance,
            zone = %controller.config.zone,
            state = %state,
            "connected to compute instance"
        );
        Ok(controller)
    }

    fn remember(&self, state: ResourceState) {
        *self.last_state.lock().unwrap_or_else(|e| e.into_inner()) = Some(state);
    }

    fn last_known(&self) -> Option<ResourceState> {
        *self.last_state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn fetch_status(&self) -> Result<ResourceState, ControlError> {
        let output = Command::new("gcloud")
            .args([
                "compute",
                "instances",
                "describe",
                &self.config.instance,
                "--project",
                &self.config.project,
                "--zone",
                &self.config.zone,
                "--format",
                "value(status)",
            ])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ControlError::CommandFailed {
                cmd: "gcloud compute instances describe".to_string(),
                stderr: stderr.into_owned(),
            });
        }

        let status = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(instance = %self.config.instance, status = %status, "instance status");
        Ok(map_status(&status))
    }

    /// Run a resume/suspend subcommand. `--async` returns once the request
    /// is accepted; the state manager confirms the transition by polling.
    async fn mutate(&self, verb: &str) -> Result<(), ControlError> {
        let output = Command::new("gcloud")
            .args([
                "compute",
                "instances",
                verb,
                &self.config.instance,
                "--project",
                &self.config.project,
                "--zone",
                &self.config.zone,
                "--async",
                "--quiet",
            ])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ControlError::CommandFailed {
                cmd: format!("gcloud compute instances {}", verb),
                stderr: stderr.into_owned(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ResourceController for GcloudController {
    async fn check_state(&self) -> Result<ResourceState, ControlError> {
        match self.fetch_status().await {
            Ok(state) => {
                self.remember(state);
                Ok(state)
            }
            Err(err) => match self.last_known() {
                Some(state) => {
                    warn!(error = %err, state = %state, "status fetch failed, serving last known state");
                    Ok(state)
                }
                None => Err(ControlError::NoStatus(err.to_string())),
            },
        }
    }

    async fn resume(&self) -> Result<(), ControlError> {
        self.mutate("resume").await
    }

    async fn suspend(&self) -> Result<(), ControlError> {
        self.mutate("suspend").await
    }
}

/// Map a compute instance status string onto the three states the control
/// loop cares about. Transitional suspend states count as suspended so a
/// machine on its way down is resumable rather than stuck unknown.
fn map_status(status: &str) -> ResourceState {
    match status {
        "RUNNING" => ResourceState::Running,
        "SUSPENDING" | "SUSPENDED" | "STAGING" => ResourceState::Suspended,
        _ => ResourceState::NotReady,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_maps_to_running() {
        assert_eq!(map_status("RUNNING"), ResourceState::Running);
    }

    #[test]
    fn suspend_family_maps_to_suspended() {
        for status in ["SUSPENDING", "SUSPENDED", "STAGING"] {
            assert_eq!(map_status(status), ResourceState::Suspended, "{}", status);
        }
    }

    #[test]
    fn unknown_statuses_map_to_not_ready() {
        for status in ["", "TERMINATED", "STOPPING", "PROVISIONING", "running"] {
            assert_eq!(map_status(status), ResourceState::NotReady, "{}", status);
        }
    }
}
