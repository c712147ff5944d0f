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

//! Field-type schemas for datagrams.
//!
//! Each datagram id has a fixed field layout assigned by the server. The
//! decoder converts the raw tokens of a datagram against this table; an
//! id without an entry here is reported as unknown and dropped by the
//! stream reader. The table covers the datagrams this library itself
//! consumes plus the common chat and presence notifications; it is not
//! the full server catalogue.

use crate::consts::dg;

/// The wire type of a single datagram field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldType {
    /// Signed decimal integer.
    Int,
    /// Single-character flag, `1` or `0`.
    Bool,
    /// Text, possibly brace-quoted on the wire.
    Str,
    /// A quoted token holding a space-separated list of words.
    List,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::Str => write!(f, "string"),
            FieldType::List => write!(f, "string-list"),
        }
    }
}

use FieldType::{Bool, Int, List, Str};

/// Returns the field layout for the given datagram id, or `None` if the
/// id has no schema known to this codec.
pub fn field_types(id: u16) -> Option<&'static [FieldType]> {
    Some(match id {
        // player-name titles
        dg::WHO_AM_I => &[Str, Str],
        // player-name
        dg::PLAYER_ARRIVED_SIMPLE | dg::PLAYER_LEFT => &[Str],
        // player-name state-code game-number
        dg::STATE => &[Str, Str, Int],
        // channel player-name titles message type
        dg::CHANNEL_TELL => &[Int, Str, Str, Str, Int],
        // player-name titles message type
        dg::PERSONAL_TELL | dg::PERSONAL_TELL_ECHO => &[Str, Str, Str, Int],
        // player-name titles type message
        dg::SHOUT => &[Str, Str, Int, Str],
        // game-number move
        dg::MOVE_ALGEBRAIC | dg::MOVE_SMITH => &[Int, Str],
        // game-number flipped
        dg::FLIP => &[Int, Bool],
        // game-number color msec running
        dg::MSEC => &[Int, Str, Int, Bool],
        // player-name sees-shouts
        dg::SEES_SHOUTS => &[Str, Bool],
        // player-name channel-numbers
        dg::CHANNELS_SHARED => &[Str, List],
        // error-code reason
        dg::LOGIN_FAILED => &[Int, Str],
        // index name
        dg::RATING_TYPE_KEY => &[Int, Str],
        // wild-number name
        dg::WILD_KEY => &[Int, Str],
        // dg-number state
        dg::SET2 => &[Int, Bool],
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn essential_ids_have_schemas() {
        for id in [dg::WHO_AM_I, dg::LOGIN_FAILED, dg::RATING_TYPE_KEY, dg::SET2] {
            assert!(field_types(id).is_some(), "no schema for dg {}", id);
        }
    }

    #[test]
    fn unassigned_id_has_no_schema() {
        assert!(field_types(54).is_none());
        assert!(field_types(1000).is_none());
    }

    #[test]
    fn set2_layout() {
        assert_eq!(field_types(dg::SET2), Some(&[Int, Bool][..]));
    }
}
