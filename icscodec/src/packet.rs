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

//! Level1 packets.
//!
//! A packet groups the server's complete response to one command:
//! `^Y[` header-line item* `^Y]`. Items are plain lines, datagrams or
//! further packets, in arrival order. Nesting depth is unbounded by the
//! protocol.

use crate::message::IcsMessage;
use crate::result::{CodecError, CodecResult};

/// A level1 packet: the response envelope for one server command.
/// Immutable once built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Packet {
    command_code: i32,
    player_name: String,
    client_tag: Option<String>,
    items: Vec<IcsMessage>,
}

impl Packet {
    /// Builds a packet directly. Intended for tests; inbound packets are
    /// assembled by the stream decoder.
    pub fn new(
        command_code: i32,
        player_name: impl Into<String>,
        client_tag: Option<String>,
        items: Vec<IcsMessage>,
    ) -> Self {
        Packet {
            command_code,
            player_name: player_name.into(),
            client_tag,
            items,
        }
    }

    /// The code of the command that triggered this packet.
    pub fn command_code(&self) -> i32 {
        self.command_code
    }

    /// The name of the player who issued the command.
    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    /// The caller-supplied correlation tag, if the command carried one.
    /// Only the outermost packet's tag is meaningful for dispatch.
    pub fn client_tag(&self) -> Option<&str> {
        self.client_tag.as_deref()
    }

    /// The packet's items, in arrival order.
    pub fn items(&self) -> &[IcsMessage] {
        &self.items
    }

    /// Number of items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Consumes the packet, yielding its items for dispatch.
    pub fn into_items(self) -> Vec<IcsMessage> {
        self.items
    }
}

/// Parses a packet header line: the text between the `^Y[` marker and the
/// end of the line. Whitespace-separated: command code, player name, and
/// an optional client tag.
///
/// A header that does not fit this shape is a fatal framing error — the
/// item stream that follows cannot be re-synchronized without it.
pub(crate) fn parse_header(header: &str) -> CodecResult<(i32, String, Option<String>)> {
    let mut tokens = header.split_whitespace();
    let command_code = tokens
        .next()
        .and_then(|token| token.parse::<i32>().ok())
        .ok_or_else(|| CodecError::BadPacketHeader(header.to_string()))?;
    let player_name = tokens
        .next()
        .ok_or_else(|| CodecError::BadPacketHeader(header.to_string()))?
        .to_string();
    let client_tag = tokens.next().map(String::from);
    Ok((command_code, player_name, client_tag))
}
