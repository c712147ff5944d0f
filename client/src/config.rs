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

//! Session configuration

use std::time::Duration;

/// ICS session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The account name to log in with. The server may assign a
    /// different canonical name; query it after login.
    pub username: String,

    /// The account password. Empty for guest logins, in which case the
    /// login line carries the username alone.
    pub password: String,

    /// The interface-identifier string assigned to the server-side
    /// `interface` variable during login.
    pub interface: String,

    /// Board sending style, applied with `set-quietly style` after
    /// login.
    pub style: u8,

    /// The level1 mode requested at connect time. Modes with the second
    /// lowest bit set (the `^Y<`/`^Y>` delimiters) are not supported.
    pub level1: u8,

    /// How long to wait for the server's login verdict before giving
    /// up. The protocol itself has no timeout; `None` waits forever.
    pub login_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: "guest".to_string(),
            password: String::new(),
            interface: "Caissa ICS library (https://github.com/huhlig/caissa)".to_string(),
            style: 1,
            level1: 0,
            login_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl SessionConfig {
    /// Create a new session configuration with the given credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Set the interface-identifier string
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = interface.into();
        self
    }

    /// Set the board sending style
    pub fn with_style(mut self, style: u8) -> Self {
        self.style = style;
        self
    }

    /// Set the level1 mode requested at connect time
    pub fn with_level1(mut self, level1: u8) -> Self {
        self.level1 = level1;
        self
    }

    /// Set the login timeout (`None` to wait forever)
    pub fn with_login_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.login_timeout = timeout;
        self
    }
}
