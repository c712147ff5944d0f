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

//! The stream codec: turns raw server bytes into [`IcsEvent`]s and
//! encodes outgoing command lines.
//!
//! The server interleaves plain lines, level1 packets and level2
//! datagrams on one socket with no length prefixes, so decoding is a
//! byte-level scan with one or two bytes of lookahead. The decoder never
//! consumes a partial unit: whenever a decision would need a byte that
//! has not arrived yet it returns `Ok(None)` and re-examines the buffer
//! on the next call. TCP chunk boundaries can therefore fall anywhere,
//! including between the two bytes of a control sequence, without
//! changing the decoded output.
//!
//! Open packets live on an explicit stack in decoder state, so packet
//! nesting is bounded only by memory.

use crate::consts::{
    CTRL, DATAGRAM_END, DATAGRAM_START, PACKET_END, PACKET_START, latin1_to_string,
    string_to_latin1,
};
use crate::datagram::Datagram;
use crate::filter::filter_line;
use crate::message::{IcsEvent, IcsMessage};
use crate::packet::{self, Packet};
use crate::result::CodecError;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Codec for the ICS wire format.
///
/// Decoding yields [`IcsEvent`]s; encoding writes command lines (text
/// plus `'\n'`, in Latin-1). One codec instance owns one direction of
/// one connection — it is stateful and not meant to be shared.
#[derive(Debug, Default)]
pub struct IcsCodec {
    /// Packets opened but not yet terminated, outermost first.
    stack: Vec<PartialPacket>,
}

#[derive(Debug)]
struct PartialPacket {
    command_code: i32,
    player_name: String,
    client_tag: Option<String>,
    items: Vec<IcsMessage>,
}

impl PartialPacket {
    fn finish(self) -> Packet {
        Packet::new(
            self.command_code,
            self.player_name,
            self.client_tag,
            self.items,
        )
    }
}

impl IcsCodec {
    /// Creates a new codec.
    pub fn new() -> IcsCodec {
        IcsCodec::default()
    }

    /// Routes a completed message: appended to the innermost open packet,
    /// or yielded to the caller when no packet is open.
    fn emit(&mut self, message: IcsMessage) -> Option<IcsEvent> {
        match self.stack.last_mut() {
            Some(open) => {
                open.items.push(message);
                None
            }
            None => Some(IcsEvent::Message(message)),
        }
    }
}

enum LineScan {
    /// The terminator has not arrived yet.
    NeedMore,
    /// A complete line of `text`; `consume` bytes cover it and its
    /// terminator (zero terminator bytes when ended by a control
    /// sequence, which stays in the buffer).
    Complete { text: String, consume: usize },
}

/// Scans a plain text line from the start of `src`.
///
/// A line ends at `'\n'`, at `'\r'` (a directly following `'\n'` belongs
/// to the terminator), or just before a [`CTRL`] byte that opens a real
/// control sequence. A `CTRL` whose follower is not a sequence opener is
/// ordinary text and stays in the line.
fn scan_line(src: &[u8]) -> LineScan {
    let mut index = 0;
    loop {
        let Some(&byte) = src.get(index) else {
            return LineScan::NeedMore;
        };
        match byte {
            b'\n' => {
                return LineScan::Complete {
                    text: latin1_to_string(&src[..index]),
                    consume: index + 1,
                };
            }
            b'\r' => {
                // Whether to eat a following '\n' needs one more byte.
                let Some(&next) = src.get(index + 1) else {
                    return LineScan::NeedMore;
                };
                let consume = if next == b'\n' { index + 2 } else { index + 1 };
                return LineScan::Complete {
                    text: latin1_to_string(&src[..index]),
                    consume,
                };
            }
            CTRL => {
                let Some(&next) = src.get(index + 1) else {
                    return LineScan::NeedMore;
                };
                match next {
                    PACKET_START | DATAGRAM_START | PACKET_END => {
                        return LineScan::Complete {
                            text: latin1_to_string(&src[..index]),
                            consume: index,
                        };
                    }
                    _ => index += 1,
                }
            }
            _ => index += 1,
        }
    }
}

fn find_byte(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}

fn find_sequence(haystack: &[u8], first: u8, second: u8) -> Option<usize> {
    haystack.windows(2).position(|w| w[0] == first && w[1] == second)
}

impl Decoder for IcsCodec {
    type Item = IcsEvent;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<IcsEvent>, CodecError> {
        loop {
            if src.is_empty() {
                return Ok(None);
            }

            if src[0] == CTRL {
                // One byte of lookahead decides what the sequence opens.
                let Some(&second) = src.get(1) else {
                    return Ok(None);
                };
                match second {
                    PACKET_START => {
                        // Header line runs to '\n'. The server ends it
                        // with "\r\n" despite what formats.txt says.
                        let Some(newline) = find_byte(&src[2..], b'\n') else {
                            return Ok(None);
                        };
                        let mut header = &src[2..2 + newline];
                        if header.last() == Some(&b'\r') {
                            header = &header[..header.len() - 1];
                        }
                        let header = latin1_to_string(header);
                        let (command_code, player_name, client_tag) =
                            packet::parse_header(&header)?;
                        src.advance(2 + newline + 1);
                        self.stack.push(PartialPacket {
                            command_code,
                            player_name,
                            client_tag,
                            items: Vec::new(),
                        });
                        continue;
                    }
                    DATAGRAM_START => {
                        let Some(end) = find_sequence(&src[2..], CTRL, DATAGRAM_END) else {
                            return Ok(None);
                        };
                        let payload = latin1_to_string(&src[2..2 + end]);
                        src.advance(2 + end + 2);
                        match Datagram::parse(&payload) {
                            Ok(datagram) => {
                                if let Some(event) = self.emit(IcsMessage::Datagram(datagram)) {
                                    return Ok(Some(event));
                                }
                            }
                            Err(err) if err.is_recoverable() => {
                                // Delimiters around the unit were intact,
                                // so framing is not lost. Drop it.
                                warn!(error = %err, "dropping undecodable datagram");
                            }
                            Err(err) => return Err(err),
                        }
                        continue;
                    }
                    PACKET_END => {
                        src.advance(2);
                        match self.stack.pop() {
                            Some(open) => {
                                if let Some(event) =
                                    self.emit(IcsMessage::Packet(open.finish()))
                                {
                                    return Ok(Some(event));
                                }
                                continue;
                            }
                            // A top-level ^Y] is the clean-logout signal.
                            None => return Ok(Some(IcsEvent::Logout)),
                        }
                    }
                    // The CTRL byte is part of ordinary text; read it as
                    // a line below.
                    _ => {}
                }
            }

            match scan_line(src) {
                LineScan::NeedMore => return Ok(None),
                LineScan::Complete { text, consume } => {
                    src.advance(consume);
                    // A line filtered down to nothing produces no
                    // message; an originally empty line survives.
                    if let Some(filtered) = filter_line(&text) {
                        if let Some(event) = self.emit(IcsMessage::Line(filtered)) {
                            return Ok(Some(event));
                        }
                    }
                }
            }
        }
    }

    /// Called once the transport reports end of stream. Distinguishes a
    /// clean exhaustion from a truncated unit: an unterminated trailing
    /// line is still delivered, but end of stream inside a control
    /// sequence or with open packets is a framing error equivalent to
    /// an unclean disconnection.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<IcsEvent>, CodecError> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }

        if !src.is_empty() {
            if src[0] == CTRL {
                match src.get(1) {
                    Some(&PACKET_START) => return Err(CodecError::TruncatedPacket),
                    Some(&DATAGRAM_START) | None => return Err(CodecError::TruncatedDatagram),
                    // PACKET_END and stray followers are consumed by
                    // decode(); a stray CTRL can only remain as part of
                    // an unterminated line, handled below.
                    Some(_) => {}
                }
            }
            let mut text = latin1_to_string(&src[..]);
            src.clear();
            if text.ends_with('\r') {
                text.pop();
            }
            if !self.stack.is_empty() {
                return Err(CodecError::TruncatedPacket);
            }
            if let Some(filtered) = filter_line(&text) {
                return Ok(Some(IcsEvent::Message(IcsMessage::Line(filtered))));
            }
            return Ok(None);
        }

        if !self.stack.is_empty() {
            return Err(CodecError::TruncatedPacket);
        }
        Ok(None)
    }
}

impl Encoder<&str> for IcsCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), CodecError> {
        let bytes = string_to_latin1(item);
        dst.reserve(bytes.len() + 1);
        dst.put_slice(&bytes);
        dst.put_u8(b'\n');
        Ok(())
    }
}

impl Encoder<String> for IcsCodec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), CodecError> {
        self.encode(item.as_str(), dst)
    }
}

impl Encoder<&Datagram> for IcsCodec {
    type Error = CodecError;

    /// Encodes a datagram in its full wire form, delimiters included.
    /// The inbound path never needs this; tests and server harnesses do.
    fn encode(&mut self, item: &Datagram, dst: &mut BytesMut) -> Result<(), CodecError> {
        let bytes = string_to_latin1(&item.to_wire());
        dst.reserve(bytes.len());
        dst.put_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut IcsCodec, mut src: BytesMut) -> Vec<IcsEvent> {
        let mut out = Vec::new();
        while let Some(event) = codec.decode(&mut src).expect("decode should not error") {
            out.push(event);
        }
        out
    }

    fn line(text: &str) -> IcsEvent {
        IcsEvent::Message(IcsMessage::Line(text.into()))
    }

    #[test]
    fn decode_simple_line() {
        let mut codec = IcsCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&b"hello\r\n"[..]));
        assert_eq!(events, vec![line("hello")]);
    }

    #[test]
    fn decode_lf_only_line() {
        let mut codec = IcsCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&b"hello\n"[..]));
        assert_eq!(events, vec![line("hello")]);
    }

    #[test]
    fn decode_cr_only_line() {
        let mut codec = IcsCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&b"hello\rworld\n"[..]));
        assert_eq!(events, vec![line("hello"), line("world")]);
    }

    #[test]
    fn prompt_is_stripped() {
        let mut codec = IcsCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&b"aics% hello\r\n"[..]));
        assert_eq!(events, vec![line("hello")]);
    }

    #[test]
    fn chrome_only_line_yields_nothing() {
        let mut codec = IcsCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&b"aics% \x07\r\nnext\r\n"[..]));
        assert_eq!(events, vec![line("next")]);
    }

    #[test]
    fn empty_line_is_a_message() {
        let mut codec = IcsCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&b"\r\n"[..]));
        assert_eq!(events, vec![line("")]);
    }

    #[test]
    fn decode_datagram() {
        let mut codec = IcsCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&b"\x19(124 56 1\x19)"[..]));
        let IcsEvent::Message(IcsMessage::Datagram(datagram)) = &events[0] else {
            panic!("expected a datagram, got {:?}", events);
        };
        assert_eq!(datagram.id(), 124);
        assert_eq!(datagram.int_at(0), 56);
        assert!(datagram.bool_at(1));
    }

    #[test]
    fn unknown_datagram_is_dropped_and_stream_continues() {
        let mut codec = IcsCodec::new();
        let events = decode_all(
            &mut codec,
            BytesMut::from(&b"\x19(97 junk fields here\x19)after\r\n"[..]),
        );
        assert_eq!(events, vec![line("after")]);
    }

    #[test]
    fn empty_packet() {
        let mut codec = IcsCodec::new();
        let events = decode_all(
            &mut codec,
            BytesMut::from(&b"\x19[100 playername\r\n\x19]"[..]),
        );
        let IcsEvent::Message(IcsMessage::Packet(packet)) = &events[0] else {
            panic!("expected a packet, got {:?}", events);
        };
        assert_eq!(packet.command_code(), 100);
        assert_eq!(packet.player_name(), "playername");
        assert_eq!(packet.client_tag(), None);
        assert_eq!(packet.item_count(), 0);
    }

    #[test]
    fn top_level_packet_end_is_logout() {
        let mut codec = IcsCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&b"\x19]"[..]));
        assert_eq!(events, vec![IcsEvent::Logout]);
    }

    #[test]
    fn stray_ctrl_is_ordinary_text() {
        let mut codec = IcsCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&b"a\x19b\r\n"[..]));
        assert_eq!(events, vec![line("a\u{19}b")]);
    }

    #[test]
    fn line_ends_early_at_control_sequence() {
        let mut codec = IcsCodec::new();
        let events = decode_all(
            &mut codec,
            BytesMut::from(&b"partial\x19(124 56 1\x19)"[..]),
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], line("partial"));
        assert!(matches!(
            events[1],
            IcsEvent::Message(IcsMessage::Datagram(_))
        ));
    }

    #[test]
    fn partial_input_yields_none_without_consuming() {
        let mut codec = IcsCodec::new();
        let mut src = BytesMut::from(&b"\x19(124 56"[..]);
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert_eq!(&src[..], b"\x19(124 56");
        src.extend_from_slice(b" 1\x19)");
        assert!(matches!(
            codec.decode(&mut src).unwrap(),
            Some(IcsEvent::Message(IcsMessage::Datagram(_)))
        ));
    }

    #[test]
    fn eof_flushes_unterminated_line() {
        let mut codec = IcsCodec::new();
        let mut src = BytesMut::from(&b"goodbye"[..]);
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert_eq!(codec.decode_eof(&mut src).unwrap(), Some(line("goodbye")));
        assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
    }

    #[test]
    fn eof_inside_packet_is_truncation() {
        let mut codec = IcsCodec::new();
        let mut src = BytesMut::from(&b"\x19[100 playername\r\nline one\r\n"[..]);
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert!(matches!(
            codec.decode_eof(&mut src),
            Err(CodecError::TruncatedPacket)
        ));
    }

    #[test]
    fn eof_inside_datagram_is_truncation() {
        let mut codec = IcsCodec::new();
        let mut src = BytesMut::from(&b"\x19(124 56"[..]);
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert!(matches!(
            codec.decode_eof(&mut src),
            Err(CodecError::TruncatedDatagram)
        ));
    }

    #[test]
    fn bad_packet_header_is_fatal() {
        let mut codec = IcsCodec::new();
        let mut src = BytesMut::from(&b"\x19[not-a-number\r\n\x19]"[..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(CodecError::BadPacketHeader(_))
        ));
    }

    #[test]
    fn encode_command_line() {
        let mut codec = IcsCodec::new();
        let mut dst = BytesMut::new();
        codec.encode("multi tell 1 hi", &mut dst).unwrap();
        assert_eq!(&dst[..], b"multi tell 1 hi\n");
    }
}
