// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.
//!
//! Each connection carries one request. The handler mirrors the proxy-side
//! connect rules: a not-ready backend rejects the client, a running one lets
//! it straight through, and a suspended one queues it and holds the
//! connection open until the control loop delivers a verdict.

use std::sync::Arc;
use std::time::Instant;

use drowse_core::{ClientHandle, KeepAlive, NotificationEvent, ResourceState};
use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error};

use crate::lifecycle::BridgeManager;
use crate::protocol::{
    self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};

/// Shared state handed to every connection handler
pub struct ServerContext {
    pub manager: Arc<BridgeManager>,
    pub start_time: Instant,
    /// Set to request daemon shutdown
    pub shutdown: watch::Sender<bool>,
}

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("request read timeout")]
    Timeout,
    #[error("protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

/// Handle a single client connection
pub async fn handle_connection(
    ctx: Arc<ServerContext>,
    stream: UnixStream,
) -> Result<(), ServerError> {
    // Split stream for reading/writing
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    // Read request with timeout
    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    // Handle request; an enqueue blocks here until the verdict lands
    let response = handle_request(&ctx, request).await;

    debug!("Sending response: {:?}", response);

    // Write response with timeout
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
async fn handle_request(ctx: &ServerContext, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => {
            let manager = &ctx.manager;
            Response::Status {
                state: manager.state(),
                queued: manager.queued(),
                players: manager.player_count(),
                keep_alive: manager.keep_alive().map(render_keep_alive),
                uptime_secs: ctx.start_time.elapsed().as_secs(),
            }
        }

        Request::Enqueue { player, count } => {
            ctx.manager.update_player_count(count);
            match ctx.manager.state() {
                ResourceState::NotReady => Response::Rejected {
                    reason: "Server is not ready.".to_string(),
                },
                ResourceState::Running => {
                    ctx.manager
                        .notify(NotificationEvent::JoinedWhileRunning, player);
                    Response::Proceed {
                        target: ctx.manager.target().to_string(),
                    }
                }
                ResourceState::Suspended => {
                    let (client, verdict) = BridgeClient::new(player);
                    ctx.manager.enqueue(client);
                    // No timeout here: resume confirmation itself is unbounded
                    match verdict.await {
                        Ok(Verdict::Proceed { target }) => Response::Proceed { target },
                        Ok(Verdict::Rejected { reason }) => Response::Rejected { reason },
                        Err(_) => Response::Error {
                            message: "daemon shutting down".to_string(),
                        },
                    }
                }
            }
        }

        Request::PlayerCount { count } => {
            ctx.manager.update_player_count(count);
            Response::Ok
        }

        Request::PlayerLeft { player, count } => {
            ctx.manager.update_player_count(count);
            ctx.manager.notify(NotificationEvent::Left, player);
            Response::Ok
        }

        Request::KeepAlive { secs } => {
            match secs {
                None => ctx.manager.keep_alive_forever(),
                Some(secs) => ctx
                    .manager
                    .keep_alive_for(std::time::Duration::from_secs(secs)),
            }
            Response::Ok
        }

        Request::Shutdown => {
            let _ = ctx.shutdown.send(true);
            Response::ShuttingDown
        }
    }
}

fn render_keep_alive(window: KeepAlive) -> String {
    match window.remaining(Instant::now()) {
        None => "forever".to_string(),
        Some(remaining) => {
            // truncate to whole seconds for readability
            let secs = std::time::Duration::from_secs(remaining.as_secs());
            humantime::format_duration(secs).to_string()
        }
    }
}

/// Verdict delivered to a queued bridge client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Proceed { target: String },
    Rejected { reason: String },
}

/// Client handle backed by the open bridge connection.
///
/// The verdict channel resolves the pending `Enqueue` exchange; dropping the
/// handle without a verdict (daemon shutdown) surfaces as an error response.
pub struct BridgeClient {
    name: Option<String>,
    verdict: oneshot::Sender<Verdict>,
}

impl BridgeClient {
    pub fn new(name: Option<String>) -> (Self, oneshot::Receiver<Verdict>) {
        let (tx, rx) = oneshot::channel();
        (Self { name, verdict: tx }, rx)
    }
}

impl ClientHandle for BridgeClient {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn connect(self, target: &str) {
        let _ = self.verdict.send(Verdict::Proceed {
            target: target.to_string(),
        });
    }

    fn disconnect(self, reason: &str) {
        let _ = self.verdict.send(Verdict::Rejected {
            reason: reason.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bridge_client_delivers_connect_verdict() {
        let (client, verdict) = BridgeClient::new(Some("alice".to_string()));
        assert_eq!(client.name(), Some("alice".to_string()));

        client.connect("world");
        assert_eq!(
            verdict.await.ok(),
            Some(Verdict::Proceed {
                target: "world".to_string()
            })
        );
    }

    #[tokio::test]
    async fn bridge_client_delivers_disconnect_verdict() {
        let (client, verdict) = BridgeClient::new(None);

        client.disconnect("Server is not ready.");
        assert_eq!(
            verdict.await.ok(),
            Some(Verdict::Rejected {
                reason: "Server is not ready.".to_string()
            })
        );
    }

    #[tokio::test]
    async fn dropped_client_resolves_to_error() {
        let (client, verdict) = BridgeClient::new(None);
        drop(client);
        assert!(verdict.await.is_err());
    }

    #[test]
    fn keep_alive_renders_forever_and_bounded_windows() {
        assert_eq!(render_keep_alive(KeepAlive::Forever), "forever");

        let bounded = KeepAlive::Until(Instant::now() + std::time::Duration::from_secs(90));
        let rendered = render_keep_alive(bounded);
        assert!(
            rendered == "1m 29s" || rendered == "1m 30s",
            "unexpected rendering: {}",
            rendered
        );
    }
}
