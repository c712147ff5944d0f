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

//! Integration tests for the ICS stream codec: mixed streams, packet
//! nesting, and the framing edge cases a live server exercises.

use bytes::BytesMut;
use caissa_icscodec::{CodecError, IcsCodec, IcsEvent, IcsMessage};
use tokio_util::codec::Decoder;

// ============================================================================
// Helper Functions
// ============================================================================

fn decode_all(codec: &mut IcsCodec, mut src: BytesMut) -> Vec<IcsEvent> {
    let mut events = Vec::new();
    while let Some(event) = codec.decode(&mut src).expect("decode should not error") {
        events.push(event);
    }
    events
}

fn line(text: &str) -> IcsEvent {
    IcsEvent::Message(IcsMessage::Line(text.into()))
}

// ============================================================================
// Mixed Streams
// ============================================================================

#[test]
fn mixed_lines_datagrams_and_packets_in_order() {
    let mut codec = IcsCodec::new();
    let wire = b"Welcome to chessclub.com\r\n\
                 \x19(0 Morphy {GM}\x19)\
                 aics% \r\n\
                 \x19[100 Morphy\r\n\x19]\
                 bye\r\n";
    let events = decode_all(&mut codec, BytesMut::from(&wire[..]));

    assert_eq!(events.len(), 4);
    assert_eq!(events[0], line("Welcome to chessclub.com"));
    let IcsEvent::Message(IcsMessage::Datagram(datagram)) = &events[1] else {
        panic!("expected datagram, got {:?}", events[1]);
    };
    assert_eq!(datagram.id(), 0);
    assert_eq!(datagram.string_at(0), "Morphy");
    assert!(matches!(
        &events[2],
        IcsEvent::Message(IcsMessage::Packet(_))
    ));
    assert_eq!(events[3], line("bye"));
}

#[test]
fn consecutive_datagrams_without_separators() {
    let mut codec = IcsCodec::new();
    let wire = b"\x19(124 24 1\x19)\x19(124 25 0\x19)";
    let events = decode_all(&mut codec, BytesMut::from(&wire[..]));
    assert_eq!(events.len(), 2);
    for (event, (id, state)) in events.iter().zip([(24, true), (25, false)]) {
        let IcsEvent::Message(IcsMessage::Datagram(datagram)) = event else {
            panic!("expected datagram, got {:?}", event);
        };
        assert_eq!(datagram.int_at(0), id);
        assert_eq!(datagram.bool_at(1), state);
    }
}

// ============================================================================
// Packet Nesting
// ============================================================================

#[test]
fn nested_packet_structure_and_order() {
    // Outer packet tagged "outer" containing: an inner packet tagged
    // "inner" holding one datagram, then a sibling line.
    let mut codec = IcsCodec::new();
    let wire = b"\x19[100 Morphy outer\r\n\
                 \x19[101 Morphy inner\r\n\
                 \x19(0 Morphy {GM}\x19)\
                 \x19]\
                 sibling line\r\n\
                 \x19]\
                 trailing\r\n";
    let events = decode_all(&mut codec, BytesMut::from(&wire[..]));

    assert_eq!(events.len(), 2);
    let IcsEvent::Message(IcsMessage::Packet(outer)) = &events[0] else {
        panic!("expected outer packet, got {:?}", events[0]);
    };
    assert_eq!(outer.client_tag(), Some("outer"));
    assert_eq!(outer.item_count(), 2);

    let IcsMessage::Packet(inner) = &outer.items()[0] else {
        panic!("expected inner packet, got {:?}", outer.items()[0]);
    };
    assert_eq!(inner.client_tag(), Some("inner"));
    assert_eq!(inner.item_count(), 1);
    assert!(matches!(inner.items()[0], IcsMessage::Datagram(_)));

    assert_eq!(outer.items()[1], IcsMessage::Line("sibling line".into()));
    assert_eq!(events[1], line("trailing"));
}

#[test]
fn packet_items_are_filtered_like_top_level_lines() {
    let mut codec = IcsCodec::new();
    let wire = b"\x19[100 Morphy\r\naics% \x07\r\nreal line\r\n\x19]";
    let events = decode_all(&mut codec, BytesMut::from(&wire[..]));

    let IcsEvent::Message(IcsMessage::Packet(packet)) = &events[0] else {
        panic!("expected packet, got {:?}", events[0]);
    };
    // The chrome-only line is suppressed entirely, not kept as "".
    assert_eq!(packet.item_count(), 1);
    assert_eq!(packet.items()[0], IcsMessage::Line("real line".into()));
}

#[test]
fn undecodable_datagram_inside_packet_is_dropped() {
    let mut codec = IcsCodec::new();
    let wire = b"\x19[100 Morphy\r\n\x19(97 ad content\x19)kept\r\n\x19]";
    let events = decode_all(&mut codec, BytesMut::from(&wire[..]));

    let IcsEvent::Message(IcsMessage::Packet(packet)) = &events[0] else {
        panic!("expected packet, got {:?}", events[0]);
    };
    assert_eq!(packet.item_count(), 1);
    assert_eq!(packet.items()[0], IcsMessage::Line("kept".into()));
}

// ============================================================================
// Session Boundaries
// ============================================================================

#[test]
fn logout_after_traffic() {
    let mut codec = IcsCodec::new();
    let wire = b"Thank you for using chessclub.com\r\n\x19]";
    let events = decode_all(&mut codec, BytesMut::from(&wire[..]));
    assert_eq!(
        events,
        vec![line("Thank you for using chessclub.com"), IcsEvent::Logout]
    );
}

#[test]
fn truncated_nested_packet_is_fatal_at_eof() {
    let mut codec = IcsCodec::new();
    let mut src = BytesMut::from(&b"\x19[100 Morphy\r\n\x19[101 Morphy\r\n\x19]"[..]);
    // Inner packet closes; outer stays open.
    assert_eq!(codec.decode(&mut src).unwrap(), None);
    assert!(matches!(
        codec.decode_eof(&mut src),
        Err(CodecError::TruncatedPacket)
    ));
}

#[test]
fn clean_eof_after_complete_traffic() {
    let mut codec = IcsCodec::new();
    let mut src = BytesMut::from(&b"last line\r\n"[..]);
    assert_eq!(codec.decode(&mut src).unwrap(), Some(line("last line")));
    assert_eq!(codec.decode(&mut src).unwrap(), None);
    assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
}

#[tokio::test]
async fn framed_read_over_a_live_stream() {
    use futures::StreamExt;
    use tokio::io::AsyncWriteExt;

    let (mut server, client) = tokio::io::duplex(256);
    let mut framed = tokio_util::codec::FramedRead::new(client, IcsCodec::new());

    server.write_all(b"hello\r\n\x19(124 56 1\x19)").await.unwrap();
    drop(server);

    let first = framed.next().await.unwrap().unwrap();
    assert_eq!(first, line("hello"));
    let second = framed.next().await.unwrap().unwrap();
    assert!(matches!(
        second,
        IcsEvent::Message(IcsMessage::Datagram(_))
    ));
    assert!(framed.next().await.is_none());
}
