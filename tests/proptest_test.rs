use bytes::BytesMut;
use proptest::prelude::*;
use std::collections::BTreeMap;
use tagwire::io::{decode_zig_zag32, decode_zig_zag64, encode_zig_zag32, encode_zig_zag64};
use tagwire::{deserialize, serialize, BufferReader, Message, Reader, Writer};

#[derive(Message, Default, Debug, PartialEq)]
struct Record {
    #[tagwire(field = 1)]
    id: i64,
    #[tagwire(field = 2, encoding = "signed")]
    delta: i32,
    #[tagwire(field = 3, encoding = "fixed")]
    checksum: i32,
    #[tagwire(field = 4)]
    name: String,
    #[tagwire(field = 5)]
    note: Option<String>,
    #[tagwire(field = 6, encoding = "signed")]
    samples: Vec<i64>,
    #[tagwire(field = 7)]
    attributes: BTreeMap<String, levels::Level>,
    #[tagwire(field = 8)]
    ratio: f64,
}

mod levels {
    use tagwire::WireEnum;

    #[derive(WireEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub enum Level {
        #[default]
        Low,
        Medium,
        High,
    }
}

use levels::Level;

fn level() -> impl Strategy<Value = Level> {
    prop_oneof![Just(Level::Low), Just(Level::Medium), Just(Level::High)]
}

fn record() -> impl Strategy<Value = Record> {
    (
        any::<i64>(),
        any::<i32>(),
        any::<i32>(),
        ".{0,16}",
        proptest::option::of(".{0,8}"),
        proptest::collection::vec(any::<i64>(), 0..16),
        proptest::collection::btree_map("[a-z]{1,4}", level(), 0..4),
        any::<f64>().prop_filter("NaN never compares equal", |v| !v.is_nan()),
    )
        .prop_map(
            |(id, delta, checksum, name, note, samples, attributes, ratio)| Record {
                id,
                delta,
                checksum,
                name,
                note,
                samples,
                attributes,
                ratio,
            },
        )
}

proptest! {
    #[test]
    fn test_zigzag32_inverts(n in any::<i32>()) {
        prop_assert_eq!(decode_zig_zag32(encode_zig_zag32(n)), n);
    }

    #[test]
    fn test_zigzag64_inverts(n in any::<i64>()) {
        prop_assert_eq!(decode_zig_zag64(encode_zig_zag64(n)), n);
    }

    #[test]
    fn test_zigzag_keeps_small_magnitudes_small(n in -64i32..64) {
        prop_assert!(encode_zig_zag32(n) < 128);
    }

    #[test]
    fn test_varint_reads_back(value in any::<u64>()) {
        let mut out = BytesMut::new();
        out.write_raw_varint64(value).unwrap();
        prop_assert_eq!(out.len(), tagwire::io::varint64_size(value));
        let mut reader = BufferReader::new(out.freeze());
        prop_assert_eq!(reader.read_raw_varint64().unwrap(), value);
        prop_assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_int32_agrees_across_widths(value in any::<i32>()) {
        let mut out = BytesMut::new();
        out.write_int32_no_tag(value).unwrap();
        let frozen = out.freeze();
        prop_assert_eq!(BufferReader::new(frozen.clone()).read_int32().unwrap(), value);
        prop_assert_eq!(BufferReader::new(frozen).read_int64().unwrap(), value as i64);
    }

    #[test]
    fn test_record_survives_a_round_trip(value in record()) {
        let bytes = serialize(&value).unwrap();
        let decoded: Record = deserialize(&bytes).unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn test_decoding_garbage_never_panics(input in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = deserialize::<Record>(&input);
    }
}
