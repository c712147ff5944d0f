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

//! # Caissa ICS Client
//!
//! Session layer for chessclub.com connections: the login handshake,
//! datagram subscription management and message dispatch, built on the
//! [`caissa_icscodec`] wire codec.
//!
//! ## Features
//!
//! - **Login state machine** — sends the level1/level2 handshake and
//!   credentials, then resolves to logged-in or failed from the
//!   server's own verdict datagrams, with a configurable timeout.
//! - **Subscription management** — tracks requested vs. acknowledged
//!   datagram settings; registering a listener turns its datagram on,
//!   unregistering the last one turns it off, and essential datagrams
//!   can never be disabled.
//! - **Listener dispatch** — datagrams and lines are delivered to
//!   registered listeners in exact arrival order, with response packets
//!   flattened and their correlation tag propagated from the outermost
//!   packet.
//! - **Transport-agnostic** — drive any connected
//!   `AsyncRead + AsyncWrite` stream; this layer never dials sockets
//!   and leaves reconnect policy to the embedding application.
//!
//! ## Quick Start
//!
//! ```no_run
//! use caissa_client::{IcsSession, SessionConfig, LineListener};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl LineListener for Printer {
//!     async fn line_received(&self, line: &str, _tag: Option<&str>) {
//!         println!("{}", line);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = IcsSession::new(SessionConfig::new("guest", ""));
//!     session.add_line_listener(Arc::new(Printer)).await;
//!
//!     let stream = tokio::net::TcpStream::connect("chessclub.com:5000").await?;
//!     session.run(stream).await?;
//!     Ok(())
//! }
//! ```

mod command;
mod config;
mod error;
mod listener;
mod session;
mod subscriptions;

pub use command::{COMMAND_SEPARATOR, MULTI_PREFIX, TAG_DELIMITER, format_command};
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use listener::{DatagramEvent, DatagramListener, LineListener};
pub use session::{IcsSession, LoginState};
pub use subscriptions::{ESSENTIAL_DGS, is_essential};

// Re-export the wire types listeners interact with.
pub use caissa_icscodec::{CodecError, Datagram, DgField, IcsMessage, Packet, dg};
