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

//! # Caissa ICS Wire Codec
//!
//! Tokio codec for the chessclub.com (ICC) server protocol: a legacy
//! text protocol that interleaves three kinds of units on one TCP
//! stream, framed only by delimiter sequences built on the `0x19`
//! control byte.
//!
//! ## Units
//!
//! - **Plain line** — human-readable text terminated by `\n` or `\r\n`,
//!   filtered of the command prompt and BEL characters.
//! - **Datagram (level2)** — `^Y(` id and typed fields `^Y)`; the
//!   compact machine-parseable notification format. Field layouts come
//!   from the per-id [`schema`] table.
//! - **Packet (level1)** — `^Y[` header line, nested items, `^Y]`; the
//!   envelope grouping the server's response to one command. Packets
//!   nest arbitrarily.
//!
//! ## Core types
//!
//! [`IcsCodec`] implements [`tokio_util::codec::Decoder`] yielding
//! [`IcsEvent`]s ([`IcsMessage`]s plus the clean-logout signal) and
//! [`tokio_util::codec::Encoder`] for outgoing command lines. Decoding
//! is incremental: partial input is never consumed, so arbitrary TCP
//! chunking cannot change the decoded output.
//!
//! ## Error model
//!
//! A unit that cannot be parsed but whose delimiters were intact (a
//! malformed or unknown datagram) is dropped with a logged diagnostic
//! and the stream continues. Anything that loses framing — a truncated
//! packet or datagram at end of stream, an unparseable packet header —
//! is fatal and must be treated as a disconnection; resynchronizing a
//! delimiter-framed stream without length prefixes is not reliably
//! possible.

#![warn(
    clippy::cargo,
    missing_docs,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(clippy::module_name_repetitions)]

mod codec;
pub mod consts;
mod datagram;
mod filter;
mod message;
mod packet;
mod result;
pub mod schema;

pub use self::codec::IcsCodec;
pub use self::consts::dg;
pub use self::datagram::{Datagram, DgField};
pub use self::filter::filter_line;
pub use self::message::{IcsEvent, IcsMessage};
pub use self::packet::Packet;
pub use self::result::{CodecError, CodecResult};
