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

//! Wire-format constants for the chessclub.com level1/level2 protocol.
//!
//! The server multiplexes three kinds of units over one byte stream: plain
//! text lines, level1 packets and level2 datagrams. Packets and datagrams
//! are bracketed by two-byte control sequences that all begin with the
//! [`CTRL`] byte; which unit follows is decided by the byte after it.

/// The standard delimiter byte (Ctrl-Y). Starts every control sequence,
/// for both level1 and level2.
pub const CTRL: u8 = 0x19;

/// Second byte of the start-of-packet sequence `^Y[`.
pub const PACKET_START: u8 = b'[';

/// Second byte of the end-of-packet sequence `^Y]`. At top level this
/// sequence is a clean-logout signal rather than a packet terminator.
pub const PACKET_END: u8 = b']';

/// Second byte of the start-of-datagram sequence `^Y(`.
pub const DATAGRAM_START: u8 = b'(';

/// Second byte of the end-of-datagram sequence `^Y)`.
pub const DATAGRAM_END: u8 = b')';

/// Opening brace of a quoted string field inside a datagram. Appears both
/// bare (`{...}`) and prefixed with [`CTRL`] (`^Y{...^Y}`).
pub const STRING_START: u8 = b'{';

/// Closing brace of a quoted string field inside a datagram.
pub const STRING_END: u8 = b'}';

/// The BEL byte, stripped from plain text lines wherever it appears.
pub const BELL: u8 = 0x07;

/// The command prompt the server prefixes to lines when prompt echo is on.
/// Stripped (repeatedly) from the start of plain text lines.
pub const PROMPT: &str = "aics% ";

/// Converts raw wire bytes to text. The wire encoding is Latin-1, so every
/// byte maps to the identically numbered character.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Converts text to wire bytes (Latin-1). Characters above U+00FF cannot
/// be represented and are replaced with `'?'`.
pub fn string_to_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect()
}

/// Datagram type numbers, as assigned by the server. See
/// `ftp://ftp.chessclub.com/pub/icc/formats/formats.txt` for the meaning
/// of each type. The numbering has gaps; ids absent from this list are
/// unassigned.
#[allow(missing_docs)]
pub mod dg {
    /// The server-confirmed name of the logged-in player.
    pub const WHO_AM_I: u16 = 0;
    pub const PLAYER_ARRIVED: u16 = 1;
    pub const PLAYER_LEFT: u16 = 2;
    pub const BULLET: u16 = 3;
    pub const BLITZ: u16 = 4;
    pub const STANDARD: u16 = 5;
    pub const WILD: u16 = 6;
    pub const BUGHOUSE: u16 = 7;
    pub const TIMESTAMP: u16 = 8;
    pub const TITLES: u16 = 9;
    pub const OPEN: u16 = 10;
    pub const STATE: u16 = 11;
    pub const GAME_STARTED: u16 = 12;
    pub const GAME_RESULT: u16 = 13;
    pub const EXAMINED_GAME_IS_GONE: u16 = 14;
    pub const MY_GAME_STARTED: u16 = 15;
    pub const MY_GAME_RESULT: u16 = 16;
    pub const MY_GAME_ENDED: u16 = 17;
    pub const STARTED_OBSERVING: u16 = 18;
    pub const STOP_OBSERVING: u16 = 19;
    pub const PLAYERS_IN_MY_GAME: u16 = 20;
    pub const OFFERS_IN_MY_GAME: u16 = 21;
    pub const TAKEBACK: u16 = 22;
    pub const BACKWARD: u16 = 23;
    pub const SEND_MOVES: u16 = 24;
    pub const MOVE_LIST: u16 = 25;
    pub const KIBITZ: u16 = 26;
    pub const PEOPLE_IN_MY_CHANNEL: u16 = 27;
    pub const CHANNEL_TELL: u16 = 28;
    pub const MATCH: u16 = 29;
    pub const MATCH_REMOVED: u16 = 30;
    pub const PERSONAL_TELL: u16 = 31;
    pub const SHOUT: u16 = 32;
    pub const MOVE_ALGEBRAIC: u16 = 33;
    pub const MOVE_SMITH: u16 = 34;
    pub const MOVE_TIME: u16 = 35;
    pub const MOVE_CLOCK: u16 = 36;
    pub const BUGHOUSE_HOLDINGS: u16 = 37;
    pub const SET_CLOCK: u16 = 38;
    pub const FLIP: u16 = 39;
    pub const ISOLATED_BOARD: u16 = 40;
    pub const REFRESH: u16 = 41;
    pub const ILLEGAL_MOVE: u16 = 42;
    pub const MY_RELATION_TO_GAME: u16 = 43;
    pub const PARTNERSHIP: u16 = 44;
    pub const SEES_SHOUTS: u16 = 45;
    pub const CHANNELS_SHARED: u16 = 46;
    pub const MY_VARIABLE: u16 = 47;
    pub const MY_STRING_VARIABLE: u16 = 48;
    pub const JBOARD: u16 = 49;
    pub const SEEK: u16 = 50;
    pub const SEEK_REMOVED: u16 = 51;
    pub const MY_RATING: u16 = 52;
    pub const SOUND: u16 = 53;
    pub const PLAYER_ARRIVED_SIMPLE: u16 = 55;
    pub const MSEC: u16 = 56;
    pub const BUGHOUSE_PASS: u16 = 57;
    pub const IP: u16 = 58;
    pub const CIRCLE: u16 = 59;
    pub const ARROW: u16 = 60;
    pub const MORETIME: u16 = 61;
    pub const PERSONAL_TELL_ECHO: u16 = 62;
    pub const SUGGESTION: u16 = 63;
    pub const NOTIFY_ARRIVED: u16 = 64;
    pub const NOTIFY_LEFT: u16 = 65;
    pub const NOTIFY_OPEN: u16 = 66;
    pub const NOTIFY_STATE: u16 = 67;
    pub const MY_NOTIFY_LIST: u16 = 68;
    /// Login was rejected; carries an error code and a reason string.
    pub const LOGIN_FAILED: u16 = 69;
    pub const FEN: u16 = 70;
    pub const TOURNEY_MATCH: u16 = 71;
    pub const GAMELIST_BEGIN: u16 = 72;
    pub const GAMELIST_ITEM: u16 = 73;
    pub const IDLE: u16 = 74;
    pub const ACK_PING: u16 = 75;
    /// Maps a rating-category index to its English name.
    pub const RATING_TYPE_KEY: u16 = 76;
    pub const GAME_MESSAGE: u16 = 77;
    pub const UNACCENTED: u16 = 78;
    pub const STRINGLIST_BEGIN: u16 = 79;
    pub const STRINGLIST_ITEM: u16 = 80;
    pub const DUMMY_RESPONSE: u16 = 81;
    pub const CHANNEL_QTELL: u16 = 82;
    pub const PERSONAL_QTELL: u16 = 83;
    pub const SET_BOARD: u16 = 84;
    pub const MATCH_ASSESSMENT: u16 = 85;
    pub const LOG_PGN: u16 = 86;
    pub const NEW_MY_RATING: u16 = 87;
    pub const LOSERS: u16 = 88;
    pub const UNCIRCLE: u16 = 89;
    pub const UNARROW: u16 = 90;
    pub const WSUGGEST: u16 = 91;
    pub const TEMPORARY_PASSWORD: u16 = 93;
    pub const MESSAGELIST_BEGIN: u16 = 94;
    pub const MESSAGELIST_ITEM: u16 = 95;
    pub const LIST: u16 = 96;
    pub const SJI_AD: u16 = 97;
    pub const RETRACT: u16 = 99;
    pub const MY_GAME_CHANGE: u16 = 100;
    pub const POSITION_BEGIN: u16 = 101;
    pub const TOURNEY: u16 = 103;
    pub const REMOVE_TOURNEY: u16 = 104;
    pub const DIALOG_START: u16 = 105;
    pub const DIALOG_DATA: u16 = 106;
    pub const DIALOG_DEFAULT: u16 = 107;
    pub const DIALOG_END: u16 = 108;
    pub const DIALOG_RELEASE: u16 = 109;
    pub const POSITION_BEGIN2: u16 = 110;
    pub const PAST_MOVE: u16 = 111;
    pub const PGN_TAG: u16 = 112;
    pub const IS_VARIATION: u16 = 113;
    pub const PASSWORD: u16 = 114;
    /// Maps a wild-variant number to its English name.
    pub const WILD_KEY: u16 = 116;
    /// Confirms a change to a datagram subscription; carries the datagram
    /// number and its new state.
    pub const SET2: u16 = 124;
    pub const KNOWS_FISCHER_RANDOM: u16 = 132;

    /// The highest assigned datagram id.
    pub const MAX_DG_ID: u16 = KNOWS_FISCHER_RANDOM;

    /// Size of fixed per-id tables. Leaves headroom above [`MAX_DG_ID`]
    /// so a newly assigned id does not require a table resize.
    pub const DG_TABLE_SIZE: usize = 256;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_round_trip() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let text = latin1_to_string(&bytes);
        assert_eq!(string_to_latin1(&text), bytes);
    }

    #[test]
    fn latin1_replaces_wide_chars() {
        assert_eq!(string_to_latin1("a\u{2603}b"), b"a?b");
    }
}
