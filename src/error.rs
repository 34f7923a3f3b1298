// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the hub.
//!
//! Each concern (configuration, broker protocol, subnet scanning, bulb
//! control, command payloads) has its own error enum. They all convert into
//! the top-level [`Error`].

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during broker communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A scan cycle could not complete.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// A bulb rejected or failed a command.
    #[error("bulb error: {0}")]
    Bulb(#[from] BulbError),

    /// An inbound command payload could not be decoded.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),
}

/// Errors raised while loading the hub configuration.
///
/// Any of these is fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration sources could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// A required value is missing or empty.
    #[error("missing required value: {0}")]
    Missing(&'static str),

    /// A value is present but not acceptable.
    #[error("invalid value for {field}: {message}")]
    Invalid {
        /// The offending configuration key.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A subnet prefix is not of the form `a.b.c`.
    #[error("invalid subnet prefix: {0}")]
    InvalidSubnet(String),

    /// A device address is not a valid IPv4 address.
    #[error("invalid device address: {0}")]
    InvalidAddress(String),
}

/// Errors related to the MQTT broker connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A request could not be queued on the MQTT client.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The connection to the broker failed or dropped.
    #[error("connection failed: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    /// The broker refused the connection.
    #[error("connection refused by broker: {0}")]
    Refused(String),
}

/// Outcome of a failed reverse-DNS probe.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The address has no reverse record. This is an ordinary non-match.
    #[error("no name found for address")]
    NotFound,

    /// The lookup did not finish within the probe timeout.
    #[error("lookup timed out after {0} ms")]
    TimedOut(u64),

    /// Any other resolver failure.
    #[error("lookup failed: {0}")]
    Failed(String),
}

impl LookupError {
    /// Returns true if this failure is an expected non-match.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Errors that abort a single scan cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// No local interface is on a `192.168.0.0/16` network.
    #[error("no local interface in 192.168.0.0/16")]
    SubnetUnavailable,

    /// A probe worker panicked or was cancelled.
    #[error("probe worker failed: {0}")]
    WorkerFailed(String),
}

/// Errors returned by a bulb client.
#[derive(Debug, Error)]
pub enum BulbError {
    /// A socket operation failed while talking to the bulb.
    #[error("socket {action} error: {source}")]
    Socket {
        /// What was being attempted (`connect`, `write`, `read`).
        action: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The bulb did not answer in time.
    #[error("bulb did not answer within {0} ms")]
    Timeout(u64),

    /// The bulb closed the connection before answering.
    #[error("connection closed by bulb")]
    ConnectionClosed,

    /// The bulb answered with an error object.
    #[error("command rejected ({code}): {message}")]
    Rejected {
        /// Error code reported by the bulb.
        code: i64,
        /// Error message reported by the bulb.
        message: String,
    },

    /// The bulb answered with something other than `ok`.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// A request or reply could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BulbError {
    /// Creates a new socket error.
    #[must_use]
    pub fn socket(action: &'static str, source: std::io::Error) -> Self {
        Self::Socket { action, source }
    }
}

/// Errors related to decoding inbound command payloads.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload is not a JSON list of device descriptors.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::InvalidSubnet("10.0".to_string());
        assert_eq!(err.to_string(), "invalid subnet prefix: 10.0");
    }

    #[test]
    fn error_from_scan_error() {
        let err: Error = ScanError::SubnetUnavailable.into();
        assert!(matches!(err, Error::Scan(ScanError::SubnetUnavailable)));
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::Invalid {
            field: "scan.worker_count",
            message: "must be between 1 and 256".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for scan.worker_count: must be between 1 and 256"
        );
    }

    #[test]
    fn lookup_error_not_found() {
        assert!(LookupError::NotFound.is_not_found());
        assert!(!LookupError::TimedOut(1000).is_not_found());
        assert!(!LookupError::Failed("network unreachable".to_string()).is_not_found());
    }

    #[test]
    fn bulb_error_display() {
        let err = BulbError::Rejected {
            code: -1,
            message: "client quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "command rejected (-1): client quota exceeded");
    }
}
