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

//! Server-chrome filtering for plain text lines.

use crate::consts::{BELL, PROMPT};

/// Strips server chrome from a plain text line: a leading command prompt
/// (possibly repeated) and BEL characters anywhere in the line.
///
/// Returns `None` when filtering leaves nothing of a non-empty line —
/// the line was pure chrome and should produce no message at all. An
/// originally empty line is a real protocol message and comes back as
/// `Some("")`.
pub fn filter_line(line: &str) -> Option<String> {
    if line.is_empty() {
        return Some(String::new());
    }

    let mut rest = line;
    while let Some(stripped) = rest.strip_prefix(PROMPT) {
        rest = stripped;
    }

    let filtered: String = rest.chars().filter(|&c| c != BELL as char).collect();

    if filtered.is_empty() { None } else { Some(filtered) }
}
