//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Error types for the ICS session layer
//!
//! A rejected login is deliberately not represented here: the server
//! answering "no" is a normal protocol outcome, surfaced as the
//! `LoginFailed` session state together with the server's reason string.

use caissa_icscodec::CodecError;
use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// ICS session error types
#[derive(Debug, Error)]
pub enum SessionError {
    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing or parsing error from the wire codec
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The session has no live connection
    #[error("Not connected")]
    NotConnected,

    /// The session is already driving a connection
    #[error("Already connected")]
    AlreadyConnected,

    /// The operation is only valid before login completes
    #[error("Already logged in")]
    AlreadyLoggedIn,

    /// A tagged command was requested under a level1 mode that does not
    /// support tagging
    #[error("Level1 state {level1} does not support tagged commands")]
    TaggingNotSupported {
        /// The offending level1 state
        level1: u8,
    },

    /// A level1 mode this library cannot decode was requested
    #[error("Level1 state {0} is unsupported (^Y</^Y> delimiters)")]
    UnsupportedLevel1(u8),

    /// A refresh was requested for a datagram that is not turned on
    #[error("Datagram {0} is not on")]
    DatagramNotOn(u16),

    /// The server never answered the login within the configured timeout
    #[error("No login response from the server")]
    LoginTimeout,
}

impl SessionError {
    /// Whether the error means the connection itself is gone or unusable.
    pub fn is_connection_error(&self) -> bool {
        match self {
            SessionError::Io(_) | SessionError::NotConnected | SessionError::LoginTimeout => true,
            SessionError::Codec(err) => !err.is_recoverable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_classification() {
        assert!(SessionError::NotConnected.is_connection_error());
        assert!(SessionError::Codec(CodecError::TruncatedPacket).is_connection_error());
        assert!(!SessionError::AlreadyLoggedIn.is_connection_error());
        assert!(!SessionError::TaggingNotSupported { level1: 2 }.is_connection_error());
    }

    #[test]
    fn display_carries_context() {
        let err = SessionError::TaggingNotSupported { level1: 3 };
        assert_eq!(
            err.to_string(),
            "Level1 state 3 does not support tagged commands"
        );
        assert_eq!(
            SessionError::DatagramNotOn(56).to_string(),
            "Datagram 56 is not on"
        );
    }
}
