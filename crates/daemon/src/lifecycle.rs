// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, file layout.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use drowse_adapters::{GcloudController, NoopSink, TracedController, WebhookSink};
use drowse_core::{
    notify_channel, Config, ConfigError, ControlError, Dispatcher, ManagerConfig, StateManager,
    SystemClock,
};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::server::BridgeClient;

/// State manager with the daemon's concrete adapter types
pub type BridgeManager =
    StateManager<TracedController<GcloudController>, BridgeClient, SystemClock>;

/// File layout for one daemon instance, derived from its config path
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration file (created with defaults if missing)
    pub config_path: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
}

impl Paths {
    /// Derive the daemon's file layout from a config path.
    ///
    /// The config file itself may not exist yet; only its location matters
    /// for keying the socket, lock, and log files.
    pub fn for_config(config_path: &Path) -> Result<Self, LifecycleError> {
        let absolute = if config_path.is_absolute() {
            config_path.to_path_buf()
        } else {
            std::env::current_dir()?.join(config_path)
        };

        let hash = instance_hash(&absolute);
        let state_dir = state_dir()?.join("instances").join(&hash);
        let socket_dir = socket_dir();

        Ok(Self {
            config_path: absolute,
            socket_path: socket_dir.join(format!("{}.sock", hash)),
            lock_path: state_dir.join("drowsed.pid"),
            log_path: state_dir.join("drowsed.log"),
        })
    }
}

/// Daemon state during operation
pub struct Daemon {
    pub paths: Paths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    /// State manager shared with connection handlers
    pub manager: Arc<BridgeManager>,
    /// Control loop task
    worker: JoinHandle<()>,
    /// Notification dispatcher task
    dispatcher: JoinHandle<()>,
    /// When daemon started
    pub start_time: Instant,
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Controller error: {0}")]
    Controller(#[from] ControlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(paths: &Paths) -> Result<Daemon, LifecycleError> {
    match startup_inner(paths).await {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(paths);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(paths: &Paths) -> Result<Daemon, LifecycleError> {
    // 1. Create state and socket directories
    if let Some(parent) = paths.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = paths.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // 2. Acquire lock file FIRST - prevents races
    let lock_file = File::create(&paths.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Reborrow as immutable

    // 3. Load configuration, writing a default template if none exists
    let config = Config::load_or_init(&paths.config_path)?;

    // 4. Connect to the compute backend BEFORE binding the socket. The
    //    initial probe fails fast on a misconfigured instance.
    let controller = TracedController::new(GcloudController::connect(config.gce.clone()).await?);

    // 5. Notification dispatcher
    let (notify_handle, notify_rx) = notify_channel();
    let dispatcher = match &config.webhook {
        Some(webhook) => {
            let sink = WebhookSink::new(webhook.url.clone(), webhook.json_key.clone());
            tokio::spawn(Dispatcher::new(notify_rx, sink, webhook.include_user).run())
        }
        None => tokio::spawn(Dispatcher::new(notify_rx, NoopSink::new(), true).run()),
    };

    // 6. State manager and its control loop worker
    let manager_config = ManagerConfig::new(
        config.server.clone(),
        config.sleep_delay,
        config.status_check_interval,
    );
    let manager: Arc<BridgeManager> = Arc::new(StateManager::new(
        manager_config,
        controller,
        notify_handle,
        SystemClock,
    ));
    let worker = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.run().await })
    };

    // 7. Remove stale socket and bind (LAST - only after all validation passes)
    if paths.socket_path.exists() {
        std::fs::remove_file(&paths.socket_path)?;
    }
    let listener = UnixListener::bind(&paths.socket_path)
        .map_err(|e| LifecycleError::BindFailed(paths.socket_path.clone(), e))?;

    info!(
        server = %config.server,
        instance = %config.gce.instance,
        "daemon started"
    );

    Ok(Daemon {
        paths: paths.clone(),
        lock_file,
        listener,
        manager,
        worker,
        dispatcher,
        start_time: Instant::now(),
    })
}

impl Daemon {
    /// Shutdown the daemon gracefully.
    ///
    /// The control loop is stopped cooperatively: an in-flight resume
    /// confirmation poll completes before the worker observes the flag.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        self.manager.stop();
        if let Err(e) = (&mut self.worker).await {
            warn!("State manager worker ended abnormally: {}", e);
        }

        // Nothing left to notify once the loop is gone
        self.dispatcher.abort();

        // Remove socket file
        if self.paths.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // Remove PID file; the lock itself is released when self is dropped
        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Clean up resources on startup failure
fn cleanup_on_failure(paths: &Paths) {
    // Remove socket if we created it
    if paths.socket_path.exists() {
        let _ = std::fs::remove_file(&paths.socket_path);
    }

    // Remove PID/lock file
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}

/// Get the state directory for drowse
fn state_dir() -> Result<PathBuf, LifecycleError> {
    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("drowse"));
    }

    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/drowse"))
}

/// Get the socket directory for drowse
///
/// Uses /tmp/drowse by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with DROWSE_SOCKET_DIR for testing.
fn socket_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DROWSE_SOCKET_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from("/tmp/drowse")
}

/// Compute config hash for unique daemon directory
fn instance_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    // Take first 16 chars of hex digest
    hex_encode(&result[..8])
}

// Hex encoding helper
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
