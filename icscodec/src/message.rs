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

//! The decoded message types produced by the stream reader.

use crate::datagram::Datagram;
use crate::packet::Packet;

/// One decoded unit from the server stream.
///
/// The three unit kinds share the wire with no length prefixes, so this
/// is the single tagged union every consumer matches on — there is no
/// further subtyping.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IcsMessage {
    /// A plain text line, already filtered of prompt and BEL chrome.
    /// May be empty: a bare newline from the server is a real message.
    Line(String),
    /// A level2 datagram.
    Datagram(Datagram),
    /// A level1 packet, with its nested items.
    Packet(Packet),
}

/// What the decoder yields per decode step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IcsEvent {
    /// A complete decoded message.
    Message(IcsMessage),
    /// The server sent a top-level `^Y]`: a clean logout. No further
    /// messages follow.
    Logout,
}
