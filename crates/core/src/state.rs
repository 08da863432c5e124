// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observed state of the backing machine

use serde::{Deserialize, Serialize};

/// State of the machine hosting the target server.
///
/// `NotReady` covers both "status unknown" and "the backend itself is not
/// queryable yet". Only the control loop writes this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    NotReady,
    Running,
    Suspended,
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceState::NotReady => "not ready",
            ResourceState::Running => "running",
            ResourceState::Suspended => "suspended",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase() {
        assert_eq!(ResourceState::NotReady.to_string(), "not ready");
        assert_eq!(ResourceState::Running.to_string(), "running");
        assert_eq!(ResourceState::Suspended.to_string(), "suspended");
    }

    #[test]
    fn serializes_as_snake_case() {
        #[derive(Serialize)]
        struct Wrap {
            state: ResourceState,
        }
        let toml = toml::to_string(&Wrap {
            state: ResourceState::NotReady,
        })
        .map_err(|e| e.to_string());
        assert_eq!(toml.as_deref(), Ok("state = \"not_ready\"\n"));
    }
}
