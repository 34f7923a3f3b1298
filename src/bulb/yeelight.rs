// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Yeelight LAN control client.
//!
//! Bulbs with LAN control enabled accept JSON commands on TCP port 55443,
//! one per line:
//!
//! - Request: `{"id":1,"method":"toggle","params":[]}\r\n`
//! - Success: `{"id":1,"result":["ok"]}\r\n`
//! - Failure: `{"id":1,"error":{"code":-1,"message":"..."}}\r\n`
//!
//! Bulbs also push `{"method":"props",...}` notifications on the same
//! connection; lines without a matching `id` are skipped.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::BulbError;

use super::BulbControl;

/// TCP port of the Yeelight LAN control service.
pub const YEELIGHT_PORT: u16 = 55443;

/// Default time allowed for connect, send and reply.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Duration of the fade when turning a bulb off, in milliseconds.
const TURN_OFF_FADE_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct Reply {
    id: Option<u64>,
    result: Option<Vec<Value>>,
    error: Option<ReplyError>,
}

#[derive(Debug, Deserialize)]
struct ReplyError {
    code: i64,
    message: String,
}

/// Client for the Yeelight LAN control protocol.
///
/// Each command opens a fresh connection, sends one request and waits for
/// the matching reply.
///
/// # Examples
///
/// ```no_run
/// use std::net::Ipv4Addr;
/// use yeehub::bulb::{BulbControl, YeelightClient};
///
/// # async fn example() -> yeehub::Result<()> {
/// let client = YeelightClient::new();
/// client.toggle(Ipv4Addr::new(192, 168, 1, 10)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct YeelightClient {
    port: u16,
    timeout: Duration,
    next_id: AtomicU64,
}

impl YeelightClient {
    /// Creates a client using the standard port and a 3 second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            port: YEELIGHT_PORT,
            timeout: DEFAULT_TIMEOUT,
            next_id: AtomicU64::new(1),
        }
    }

    /// Sets the TCP port (default: 55443).
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the timeout covering connect, send and reply (default: 3 seconds).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends `method` with `params` to the bulb and waits for an `ok` reply.
    async fn send(&self, address: Ipv4Addr, method: &str, params: Value) -> Result<(), BulbError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut request = serde_json::to_string(&json!({
            "id": id,
            "method": method,
            "params": params,
        }))?;
        request.push_str("\r\n");

        tracing::debug!(address = %address, request = %request.trim_end(), "Sending bulb command");

        // Safe: timeouts are configured in milliseconds well below u64::MAX
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = self.timeout.as_millis() as u64;

        tokio::time::timeout(self.timeout, self.exchange(address, id, &request))
            .await
            .map_err(|_| BulbError::Timeout(timeout_ms))?
    }

    async fn exchange(&self, address: Ipv4Addr, id: u64, request: &str) -> Result<(), BulbError> {
        let mut stream = TcpStream::connect((address, self.port))
            .await
            .map_err(|e| BulbError::socket("connect", e))?;

        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| BulbError::socket("write", e))?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .await
                .map_err(|e| BulbError::socket("read", e))?;
            if read == 0 {
                return Err(BulbError::ConnectionClosed);
            }
            if let Some(outcome) = parse_reply(&line, id)? {
                return outcome;
            }
        }
    }
}

impl Default for YeelightClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Interprets one reply line.
///
/// Returns `None` for lines that do not answer request `id` (notifications,
/// blank lines).
fn parse_reply(line: &str, id: u64) -> Result<Option<Result<(), BulbError>>, BulbError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let reply: Reply = serde_json::from_str(line)?;
    if reply.id != Some(id) {
        return Ok(None);
    }

    if let Some(error) = reply.error {
        return Ok(Some(Err(BulbError::Rejected {
            code: error.code,
            message: error.message,
        })));
    }

    let ok = reply
        .result
        .as_deref()
        .and_then(<[Value]>::first)
        .and_then(Value::as_str)
        == Some("ok");

    if ok {
        Ok(Some(Ok(())))
    } else {
        Ok(Some(Err(BulbError::UnexpectedReply(line.to_string()))))
    }
}

impl BulbControl for YeelightClient {
    async fn toggle(&self, address: Ipv4Addr) -> Result<(), BulbError> {
        self.send(address, "toggle", json!([])).await
    }

    async fn turn_off(&self, address: Ipv4Addr) -> Result<(), BulbError> {
        self.send(address, "set_power", json!(["off", "smooth", TURN_OFF_FADE_MS]))
            .await
    }
}
