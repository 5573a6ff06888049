// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! None of these errors is fatal to a running session. Transport failures
//! end in a scheduled reconnect, malformed payloads and unresolved devices
//! are logged and dropped. The hierarchy exists so callers of the command
//! surface (and tests) can tell the cases apart.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred in the MQTT transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error occurred while parsing a payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The bridge configuration is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A friendly name or IEEE address is not in the current directory.
    #[error("device not in directory: {0}")]
    UnresolvedDevice(String),

    /// The device exists in the directory but has no driver assignment.
    #[error("device is not claimed: {0}")]
    NotClaimed(String),

    /// The session task has stopped and no longer accepts commands.
    #[error("session is closed")]
    SessionClosed,
}

/// Errors related to the MQTT transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The MQTT client rejected a request.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No transport is open.
    #[error("transport is not connected")]
    NotConnected,

    /// Invalid broker URI or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors related to parsing Zigbee2MQTT payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is valid JSON but not of the expected shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Errors related to bridge settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("missing setting: {0}")]
    MissingSetting(String),

    /// A setting is present but cannot be interpreted.
    #[error("invalid value {value:?} for setting {key}")]
    InvalidSetting {
        /// The setting key.
        key: String,
        /// The rejected value.
        value: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidSetting {
            key: "port".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value \"abc\" for setting port");
    }

    #[test]
    fn error_from_transport_error() {
        let err: Error = TransportError::NotConnected.into();
        assert!(matches!(err, Error::Transport(TransportError::NotConnected)));
    }

    #[test]
    fn parse_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = ParseError::from(json_err).into();
        assert!(err.to_string().starts_with("parse error: JSON parse error"));
    }

    #[test]
    fn unresolved_device_display() {
        let err = Error::UnresolvedDevice("Kitchen Lamp".to_string());
        assert_eq!(err.to_string(), "device not in directory: Kitchen Lamp");
    }
}
