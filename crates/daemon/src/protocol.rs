// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between drowsed and its clients (the proxy bridge and
//! operator tooling)
//!
//! One JSON value per line over the daemon's Unix socket. A connection
//! carries a single request/response exchange; an `Enqueue` request keeps
//! the connection open until the queued client receives its verdict.

use drowse_core::ResourceState;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

pub const PROTOCOL_VERSION: &str = "1";

/// Timeout for reading a request and writing a response. Does not bound how
/// long an enqueued client waits for its verdict.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Requests accepted by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Hello {
        version: String,
    },
    Ping,
    Status,
    /// A client wants the target server; the daemon answers with a verdict
    /// once one exists. `count` is the proxy's current player count.
    Enqueue {
        player: Option<String>,
        count: u32,
    },
    /// Player count changed without a connection attempt
    PlayerCount {
        count: u32,
    },
    /// A player disconnected; `count` excludes them already
    PlayerLeft {
        player: Option<String>,
        count: u32,
    },
    /// Keep the server up: no `secs` means indefinitely, zero cancels
    KeepAlive {
        secs: Option<u64>,
    },
    Shutdown,
}

/// Responses sent by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Hello {
        version: String,
    },
    Pong,
    Status {
        state: ResourceState,
        queued: usize,
        players: u32,
        /// Remaining keep-alive window, `"forever"` when unbounded
        keep_alive: Option<String>,
        uptime_secs: u64,
    },
    /// Connect the client to the named server
    Proceed {
        target: String,
    },
    /// Turn the client away with this message
    Rejected {
        reason: String,
    },
    Ok,
    ShuttingDown,
    Error {
        message: String,
    },
}

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("timed out")]
    Timeout,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode a message as raw JSON (no framing)
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a message from raw JSON
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read one newline-terminated request
pub async fn read_request<R>(reader: &mut R, limit: Duration) -> Result<Request, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = timeout(limit, reader.read_line(&mut line))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    if read == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    decode(line.trim_end().as_bytes())
}

/// Write one newline-terminated response
pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    limit: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = encode(response)?;
    bytes.push(b'\n');
    timeout(limit, async {
        writer.write_all(&bytes).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| ProtocolError::Timeout)??;
    Ok(())
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
