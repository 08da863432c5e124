// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound event notifications
//!
//! The control loop hands notifications off through an unbounded channel and
//! never waits for delivery; a dispatcher task renders the message text and
//! pushes it into the configured sink. Delivery failures are logged and
//! swallowed.

use crate::adapters::NotificationSink;
use tokio::sync::mpsc;
use tracing::error;

/// Events worth telling the outside world about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationEvent {
    /// The server was resumed for a waiting client
    Resumed,
    /// The server was suspended for inactivity
    Suspended,
    /// Someone joined while the server was already up
    JoinedWhileRunning,
    /// Someone left
    Left,
    /// The server was resumed (or kept up) by a keep-alive window
    KeepAliveEnabled,
}

/// A notification waiting to be rendered and delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub event: NotificationEvent,
    pub actor: Option<String>,
    /// Player count observed when the event fired
    pub players: u32,
}

/// Sending half handed to the state manager and the proxy bridge
#[derive(Clone)]
pub struct NotifyHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl NotifyHandle {
    /// Queue a notification. Never blocks; if the dispatcher is gone the
    /// notification is silently dropped (shutdown is underway).
    pub fn send(&self, event: NotificationEvent, actor: Option<String>, players: u32) {
        let _ = self.tx.send(Outbound {
            event,
            actor,
            players,
        });
    }
}

/// Create the channel between the state manager and a dispatcher
pub fn notify_channel() -> (NotifyHandle, mpsc::UnboundedReceiver<Outbound>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NotifyHandle { tx }, rx)
}

/// Background task draining the notification channel into a sink
pub struct Dispatcher<N> {
    rx: mpsc::UnboundedReceiver<Outbound>,
    sink: N,
    include_actor: bool,
}

impl<N: NotificationSink> Dispatcher<N> {
    pub fn new(rx: mpsc::UnboundedReceiver<Outbound>, sink: N, include_actor: bool) -> Self {
        Self {
            rx,
            sink,
            include_actor,
        }
    }

    /// Run until every sender is dropped
    pub async fn run(mut self) {
        while let Some(outbound) = self.rx.recv().await {
            let actor = if self.include_actor {
                outbound.actor
            } else {
                None
            };
            let text = render_message(outbound.event, actor.as_deref(), outbound.players);
            if let Err(err) = self.sink.deliver(&text).await {
                error!(error = %err, "unable to send notification");
            }
        }
    }
}

/// Render the message text for an event
pub fn render_message(event: NotificationEvent, actor: Option<&str>, players: u32) -> String {
    match (event, actor) {
        (NotificationEvent::Resumed, Some(name)) => {
            format!("Server resumed: {} joined the game.", name)
        }
        (NotificationEvent::Resumed, None) => "Server resumed: someone joined.".to_string(),
        (NotificationEvent::Suspended, _) => "Server suspended.".to_string(),
        (NotificationEvent::JoinedWhileRunning, Some(name)) => {
            format!("{} joined the game. ({} players online)", name, players)
        }
        (NotificationEvent::JoinedWhileRunning, None) => {
            format!("Someone just joined. ({} players online)", players)
        }
        (NotificationEvent::Left, Some(name)) => {
            format!("{} left the game. ({} players now online)", name, players)
        }
        (NotificationEvent::Left, None) => {
            format!("Someone just left. ({} players now online)", players)
        }
        (NotificationEvent::KeepAliveEnabled, _) => "Server keepalive enabled.".to_string(),
    }
}
