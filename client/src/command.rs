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

//! Outgoing command formatting.

use crate::error::SessionError;

/// Prefix that defeats server-side command aliasing. `multi` runs the
/// rest of the line as a command sequence, and alias expansion does not
/// apply to its arguments.
pub const MULTI_PREFIX: &str = "multi ";

/// Separator between commands in a command sequence. A command that
/// already contains one cannot safely be wrapped in `multi`.
pub const COMMAND_SEPARATOR: char = ';';

/// Delimiter around a client tag prepended to a command.
pub const TAG_DELIMITER: char = '`';

/// Level1 bits compatible with tagged commands. Bit 1 selects the
/// unsupported `^Y<`/`^Y>` framing, under which the server would not
/// echo tags back in packet headers.
const TAGGABLE_LEVEL1_MASK: u8 = 0b101;

/// Builds the wire form of a command.
///
/// With `avoid_aliasing`, the command is prefixed with [`MULTI_PREFIX`]
/// unless it already starts with it or contains a
/// [`COMMAND_SEPARATOR`]. With a `tag`, the tag is prepended wrapped in
/// [`TAG_DELIMITER`]s; the server echoes it in the header of the
/// response packet. Tagging requires a compatible `level1` state.
pub fn format_command(
    command: &str,
    avoid_aliasing: bool,
    tag: Option<&str>,
    level1: u8,
) -> Result<String, SessionError> {
    let mut command = command.to_string();

    if avoid_aliasing
        && !command.starts_with(MULTI_PREFIX)
        && !command.contains(COMMAND_SEPARATOR)
    {
        command.insert_str(0, MULTI_PREFIX);
    }

    if let Some(tag) = tag {
        if (level1 & TAGGABLE_LEVEL1_MASK) != level1 {
            return Err(SessionError::TaggingNotSupported { level1 });
        }
        command = format!("{}{}{}{}", TAG_DELIMITER, tag, TAG_DELIMITER, command);
    }

    Ok(command)
}
