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

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur while decoding or encoding
/// the wire stream.
///
/// Errors split into two classes. Unit-level errors
/// ([`MalformedDatagram`](CodecError::MalformedDatagram),
/// [`UnknownDatagram`](CodecError::UnknownDatagram)) are recoverable: the
/// delimiters around the bad unit are intact, so the decoder drops the
/// unit and the stream continues. Everything else threatens framing
/// integrity and is fatal to the connection.
#[derive(Debug)]
pub enum CodecError {
    /// An I/O error occurred on the underlying stream.
    Io(std::io::Error),

    /// A datagram unit could not be parsed against its schema.
    ///
    /// Contains the datagram id (when one could be read) and a
    /// description of what was wrong.
    MalformedDatagram {
        /// The datagram id, if the id token itself was readable
        id: Option<u16>,
        /// Description of the malformation
        reason: String,
    },

    /// A datagram arrived with an id the codec has no field schema for.
    UnknownDatagram(u16),

    /// A packet header line could not be parsed. Fatal: the items that
    /// follow cannot be re-synchronized.
    BadPacketHeader(String),

    /// The stream ended while one or more packets were still open.
    TruncatedPacket,

    /// The stream ended in the middle of a datagram or control sequence.
    TruncatedDatagram,
}

impl CodecError {
    /// Whether the decoder can drop the offending unit and keep going.
    /// Non-recoverable errors are treated as disconnection.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CodecError::MalformedDatagram { .. } | CodecError::UnknownDatagram(_)
        )
    }
}

impl std::error::Error for CodecError {}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Io(err) => write!(f, "I/O error: {}", err),
            CodecError::MalformedDatagram { id: Some(id), reason } => {
                write!(f, "Malformed datagram {}: {}", id, reason)
            }
            CodecError::MalformedDatagram { id: None, reason } => {
                write!(f, "Malformed datagram: {}", reason)
            }
            CodecError::UnknownDatagram(id) => {
                write!(f, "No schema for datagram {}", id)
            }
            CodecError::BadPacketHeader(header) => {
                write!(f, "Bad packet header line: {:?}", header)
            }
            CodecError::TruncatedPacket => {
                write!(f, "Stream ended inside an unterminated packet")
            }
            CodecError::TruncatedDatagram => {
                write!(f, "Stream ended inside an unterminated datagram")
            }
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification() {
        assert!(CodecError::UnknownDatagram(97).is_recoverable());
        assert!(
            CodecError::MalformedDatagram {
                id: Some(3),
                reason: "x".into()
            }
            .is_recoverable()
        );
        assert!(!CodecError::TruncatedPacket.is_recoverable());
        assert!(!CodecError::BadPacketHeader("junk".into()).is_recoverable());
    }
}
