//! Wire codec tests: round-trips over the full value space and truncation
//! safety for every strict prefix of a valid encoding.

use nodepulse::error::DecodeError;
use nodepulse::protocol::{decode, encode, Message, PROTOCOL_VERSION};
use proptest::prelude::*;

#[test]
fn round_trip_representative_heartbeat() {
    let msg = Message {
        version: PROTOCOL_VERSION,
        mode: false,
        node_id: "A".to_string(),
        timestamp: 1000,
        reserve: 0,
        payload: "f1.txt,f2.txt".to_string(),
    };
    assert_eq!(decode(&encode(&msg)).unwrap(), msg);
}

#[test]
fn encoded_layout_is_fixed_order() {
    let msg = Message {
        version: 1,
        mode: false,
        node_id: "ab".to_string(),
        timestamp: 2,
        reserve: 3,
        payload: "c".to_string(),
    };
    let data = encode(&msg);

    assert_eq!(data[0], 1); // version
    assert_eq!(data[1], 0); // mode
    assert_eq!(&data[2..6], &2u32.to_be_bytes()); // node_id length
    assert_eq!(&data[6..8], b"ab");
    assert_eq!(&data[8..16], &2i64.to_be_bytes()); // timestamp
    assert_eq!(&data[16..20], &3i32.to_be_bytes()); // reserve
    assert_eq!(&data[20..24], &1u32.to_be_bytes()); // payload length
    assert_eq!(&data[24..], b"c");
}

#[test]
fn every_strict_prefix_fails_cleanly() {
    let msg = Message {
        version: PROTOCOL_VERSION,
        mode: false,
        node_id: "node-7".to_string(),
        timestamp: 1_700_000_000_000,
        reserve: -3,
        payload: "a.txt,b.txt".to_string(),
    };
    let data = encode(&msg);

    for len in 0..data.len() {
        match decode(&data[..len]) {
            Err(DecodeError::Truncated { .. }) | Err(DecodeError::Malformed { .. }) => {}
            Ok(m) => panic!("{len}-byte prefix decoded as {m:?}"),
        }
    }
}

proptest! {
    #[test]
    fn round_trip_any_message(
        version in any::<u8>(),
        mode in any::<bool>(),
        node_id in ".{0,64}",
        timestamp in any::<i64>(),
        reserve in any::<i32>(),
        payload in ".{0,256}",
    ) {
        let msg = Message { version, mode, node_id, timestamp, reserve, payload };
        let decoded = decode(&encode(&msg)).unwrap();
        prop_assert_eq!(decoded, msg);
    }

    #[test]
    fn prefixes_never_decode(
        node_id in ".{0,32}",
        payload in ".{0,128}",
        cut in any::<prop::sample::Index>(),
    ) {
        let msg = Message {
            version: PROTOCOL_VERSION,
            mode: false,
            node_id,
            timestamp: 42,
            reserve: 0,
            payload,
        };
        let data = encode(&msg);
        let len = cut.index(data.len());
        prop_assert!(decode(&data[..len]).is_err());
    }
}
