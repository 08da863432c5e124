// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server state manager
//!
//! One background worker owns every state transition: it probes the backing
//! machine, resumes it when clients queue up or a keep-alive window is open,
//! suspends it after the configured idle delay, and releases or drops queued
//! clients as a unit. Everything it shares with the event-handling tasks
//! lives in a single struct behind one mutex; the guard is dropped before
//! every remote call, because resume confirmation can poll for many seconds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::adapters::{ClientHandle, ControlError, ResourceController};
use crate::clock::{Clock, SystemClock};
use crate::keepalive::KeepAlive;
use crate::notify::{NotificationEvent, NotifyHandle};
use crate::queue::ConnectionQueue;
use crate::state::ResourceState;

/// Poll interval while waiting for a resume to take effect
const RESUME_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Retry interval while the backend reports nothing useful
const NOT_READY_RETRY: Duration = Duration::from_secs(5);
/// Upper bound on an idle iteration's sleep
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Control loop settings
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Name of the proxied server the queue releases clients to
    pub target: String,
    /// Zero-player duration required before a suspend is attempted
    pub sleep_delay: Duration,
    /// Interval between periodic status re-queries
    pub status_check_interval: Duration,
    pub resume_poll_interval: Duration,
    pub not_ready_retry: Duration,
    pub idle_wait: Duration,
}

impl ManagerConfig {
    pub fn new(
        target: impl Into<String>,
        sleep_delay: Duration,
        status_check_interval: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            sleep_delay,
            status_check_interval,
            resume_poll_interval: RESUME_POLL_INTERVAL,
            not_ready_retry: NOT_READY_RETRY,
            idle_wait: IDLE_WAIT,
        }
    }
}

/// Fields shared between the control loop and the public operations.
/// Invariant: mutated only under the manager's lock; state and queue changes
/// that depend on each other happen in the same critical section.
struct Shared<C> {
    state: ResourceState,
    queue: ConnectionQueue<C>,
    /// Player count as last reported by the proxy
    last_count: u32,
    /// Last time the observed count was above zero
    last_active: Instant,
    keep_alive: Option<KeepAlive>,
    last_status_check: Instant,
}

impl<C: ClientHandle> Shared<C> {
    fn keep_alive_effective(&self, now: Instant) -> bool {
        self.keep_alive.as_ref().is_some_and(|k| k.effective(now))
    }
}

/// One transition per loop iteration, first matching rule wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// State unknown: query the backend and adopt its answer
    Probe,
    /// Running with clients still queued from a previous resume
    ReleaseQueue,
    /// Suspended with demand (queued clients or an open keep-alive window)
    Resume,
    /// Idle past the configured delay
    Suspend,
    /// Periodic status refresh
    HealthCheck,
    /// Nothing to do
    Wait,
}

fn decide<C: ClientHandle>(shared: &Shared<C>, now: Instant, config: &ManagerConfig) -> Action {
    if shared.state == ResourceState::NotReady {
        return Action::Probe;
    }
    if shared.state == ResourceState::Running && !shared.queue.is_empty() {
        return Action::ReleaseQueue;
    }
    if shared.state == ResourceState::Suspended
        && (!shared.queue.is_empty() || shared.keep_alive_effective(now))
    {
        return Action::Resume;
    }
    if shared.state == ResourceState::Running
        && !shared.keep_alive_effective(now)
        && shared.last_count == 0
        && now.duration_since(shared.last_active) > config.sleep_delay
    {
        return Action::Suspend;
    }
    if now.duration_since(shared.last_status_check) > config.status_check_interval {
        return Action::HealthCheck;
    }
    Action::Wait
}

/// State manager bound to one target server and one backing machine.
///
/// Constructed once at startup; `run` loops until [`stop`](Self::stop).
pub struct StateManager<R, C, K = SystemClock> {
    config: ManagerConfig,
    controller: R,
    notifier: NotifyHandle,
    clock: K,
    shared: Mutex<Shared<C>>,
    wake: Notify,
    stopped: AtomicBool,
}

impl<R, C, K> StateManager<R, C, K>
where
    R: ResourceController,
    C: ClientHandle,
    K: Clock,
{
    pub fn new(config: ManagerConfig, controller: R, notifier: NotifyHandle, clock: K) -> Self {
        let now = clock.now();
        Self {
            config,
            controller,
            notifier,
            clock,
            shared: Mutex::new(Shared {
                state: ResourceState::NotReady,
                queue: ConnectionQueue::new(),
                last_count: 0,
                last_active: now,
                keep_alive: None,
                last_status_check: now,
            }),
            wake: Notify::new(),
            stopped: AtomicBool::new(false),
        }
    }

    // === Public operations (called from event-handling tasks) ===

    pub fn state(&self) -> ResourceState {
        self.lock().state
    }

    pub fn target(&self) -> &str {
        &self.config.target
    }

    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn player_count(&self) -> u32 {
        self.lock().last_count
    }

    pub fn keep_alive(&self) -> Option<KeepAlive> {
        self.lock().keep_alive
    }

    /// Queue a client for release once the server is up and wake the loop
    pub fn enqueue(&self, client: C) {
        self.lock().queue.push(client);
        self.wake.notify_one();
    }

    /// Record the player count reported by the proxy. The count is taken as
    /// authoritative; the loop never polls player lists itself.
    pub fn update_player_count(&self, count: u32) {
        let mut shared = self.lock();
        shared.last_count = count;
        if count > 0 {
            shared.last_active = self.clock.now();
        }
    }

    /// Keep the server up for the given duration. Zero cancels any window,
    /// including an unbounded one.
    pub fn keep_alive_for(&self, duration: Duration) {
        {
            let mut shared = self.lock();
            if duration.is_zero() {
                shared.keep_alive = None;
                info!("keep-alive window cleared");
            } else {
                shared.keep_alive = Some(KeepAlive::Until(self.clock.now() + duration));
                info!(window = %humantime::format_duration(duration), "keep-alive window set");
            }
        }
        self.wake.notify_one();
    }

    /// Keep the server up until explicitly cancelled
    pub fn keep_alive_forever(&self) {
        self.lock().keep_alive = Some(KeepAlive::Forever);
        info!("keep-alive window set indefinitely");
        self.wake.notify_one();
    }

    /// Queue a notification with the player count observed right now
    pub fn notify(&self, event: NotificationEvent, actor: Option<String>) {
        let players = self.lock().last_count;
        self.notifier.send(event, actor, players);
    }

    /// Request shutdown; the loop exits before starting another transition
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    // === Control loop ===

    /// Run until stopped. Exactly one instance of this loop may run; it is
    /// the only writer of the resource state.
    pub async fn run(&self) {
        info!(server = %self.config.target, "state manager started");
        while !self.is_stopped() {
            self.step().await;
        }
        info!(server = %self.config.target, "state manager stopped");
    }

    async fn step(&self) {
        let action = {
            let mut shared = self.lock();
            let now = self.clock.now();
            if shared.last_count > 0 {
                shared.last_active = now;
            }
            decide(&shared, now, &self.config)
        };
        match action {
            Action::Probe => self.probe().await,
            Action::ReleaseQueue => self.release_queue(),
            Action::Resume => self.resume().await,
            Action::Suspend => self.suspend().await,
            Action::HealthCheck => self.health_check().await,
            Action::Wait => self.wait(self.config.idle_wait).await,
        }
    }

    /// Sleep up to `limit`, woken early by enqueue, keep-alive changes, or stop
    async fn wait(&self, limit: Duration) {
        tokio::select! {
            _ = self.wake.notified() => {}
            _ = tokio::time::sleep(limit) => {}
        }
    }

    async fn probe(&self) {
        self.lock().last_status_check = self.clock.now();
        match self.controller.check_state().await {
            Ok(state) => {
                self.lock().state = state;
                debug!(state = %state, "adopted probed state");
                if state == ResourceState::NotReady {
                    self.wait(self.config.not_ready_retry).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "status query failed while not ready");
                self.wait(self.config.not_ready_retry).await;
            }
        }
    }

    /// Connect everything still queued; left over when a resume finished on
    /// the previous iteration
    fn release_queue(&self) {
        let mut shared = self.lock();
        let released = shared.queue.connect_all(&self.config.target);
        info!(count = released, server = %self.config.target, "released queued clients");
    }

    async fn resume(&self) {
        info!(server = %self.config.target, "resuming suspended machine");
        let mut observed = ResourceState::Suspended;
        // Lock stays released for the whole resume and confirmation poll;
        // enqueues and count updates keep flowing meanwhile.
        let result = async {
            self.controller.resume().await?;
            while observed == ResourceState::Suspended {
                tokio::time::sleep(self.config.resume_poll_interval).await;
                observed = self.controller.check_state().await?;
            }
            Ok::<(), ControlError>(())
        }
        .await;

        let now = self.clock.now();
        let mut shared = self.lock();
        shared.last_status_check = now;
        shared.state = observed;
        match result {
            Ok(()) => {
                info!(state = %observed, server = %self.config.target, "machine resumed");
                let players = shared.last_count;
                if shared.keep_alive_effective(now) {
                    self.notifier
                        .send(NotificationEvent::KeepAliveEnabled, None, players);
                } else {
                    let mut names = shared.queue.names().into_iter();
                    if let Some(first) = names.next() {
                        self.notifier.send(NotificationEvent::Resumed, first, players);
                    }
                    for name in names {
                        self.notifier
                            .send(NotificationEvent::JoinedWhileRunning, name, players);
                    }
                }
                // queued clients connect on the next iteration, once the
                // adopted state has settled
            }
            Err(err) => {
                error!(error = %err, server = %self.config.target, "resume failed");
                let dropped = shared.queue.disconnect_all(&format!(
                    "There was an error when resuming the server:\n{}\nPlease try again later.",
                    err
                ));
                if dropped > 0 {
                    warn!(count = dropped, "dropped queued clients after failed resume");
                }
            }
        }
    }

    async fn suspend(&self) {
        // Flip to suspended before letting go of the lock so new joins queue
        // up instead of racing into a machine that is going down.
        self.lock().state = ResourceState::Suspended;
        match self.controller.suspend().await {
            Ok(()) => {
                let mut shared = self.lock();
                shared.state = ResourceState::Suspended;
                shared.last_status_check = self.clock.now();
                let players = shared.last_count;
                drop(shared);
                info!(server = %self.config.target, "machine suspended");
                self.notifier
                    .send(NotificationEvent::Suspended, None, players);
            }
            Err(err) => {
                error!(error = %err, server = %self.config.target, "suspend failed");
                // Never assume either outcome: ask the backend what actually
                // happened, and admit ignorance if it will not say.
                let confirmed = match self.controller.check_state().await {
                    Ok(state) => state,
                    Err(err) => {
                        warn!(error = %err, "could not confirm state after failed suspend");
                        ResourceState::NotReady
                    }
                };
                let mut shared = self.lock();
                shared.state = confirmed;
                shared.last_status_check = self.clock.now();
            }
        }
    }

    async fn health_check(&self) {
        self.lock().last_status_check = self.clock.now();
        match self.controller.check_state().await {
            Ok(state) => {
                self.lock().state = state;
                debug!(state = %state, "periodic status check");
            }
            Err(err) => warn!(error = %err, "periodic status check failed"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared<C>> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
