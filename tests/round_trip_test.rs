use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tagwire::{
    deserialize, serialize, BufferReader, IntMap, LongSet, Limits, Message, Serializer,
    StreamReader, WireEnum,
};

// =============================================================================
// Scalars and encodings
// =============================================================================

#[derive(Message, Default, Debug, PartialEq)]
struct Scalars {
    #[tagwire(field = 1)]
    byte: i8,
    #[tagwire(field = 2)]
    short: i16,
    #[tagwire(field = 3)]
    int: i32,
    #[tagwire(field = 4)]
    long: i64,
    #[tagwire(field = 5)]
    float: f32,
    #[tagwire(field = 6)]
    double: f64,
    #[tagwire(field = 7)]
    flag: bool,
    #[tagwire(field = 8)]
    letter: char,
    #[tagwire(field = 9)]
    text: String,
    #[tagwire(field = 10)]
    blob: Bytes,
}

#[derive(Message, Default, Debug, PartialEq)]
struct SignedScalars {
    #[tagwire(field = 1, encoding = "signed")]
    byte: i8,
    #[tagwire(field = 2, encoding = "signed")]
    short: i16,
    #[tagwire(field = 3, encoding = "signed")]
    int: i32,
    #[tagwire(field = 4, encoding = "signed")]
    long: i64,
    #[tagwire(field = 5, encoding = "signed")]
    letter: char,
}

#[derive(Message, Default, Debug, PartialEq)]
struct FixedScalars {
    #[tagwire(field = 1, encoding = "fixed")]
    byte: i8,
    #[tagwire(field = 2, encoding = "fixed")]
    short: i16,
    #[tagwire(field = 3, encoding = "fixed")]
    int: i32,
    #[tagwire(field = 4, encoding = "fixed")]
    long: i64,
    #[tagwire(field = 5, encoding = "fixed")]
    letter: char,
}

#[test]
fn test_scalars_round_trip() {
    let value = Scalars {
        byte: -128,
        short: i16::MIN,
        int: -1,
        long: i64::MIN,
        float: 1.5,
        double: -0.25,
        flag: true,
        letter: '\u{1F980}',
        text: "héllo".to_string(),
        blob: Bytes::from_static(&[0, 1, 2, 255]),
    };
    let bytes = serialize(&value).unwrap();
    let decoded: Scalars = deserialize(&bytes).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_default_values_round_trip() {
    let bytes = serialize(&Scalars::default()).unwrap();
    let decoded: Scalars = deserialize(&bytes).unwrap();
    assert_eq!(decoded, Scalars::default());
}

#[test]
fn test_signed_and_fixed_round_trip() {
    for (byte, short, int, long) in [
        (i8::MIN, i16::MIN, i32::MIN, i64::MIN),
        (i8::MAX, i16::MAX, i32::MAX, i64::MAX),
        (-1, -1, -1, -1),
        (0, 0, 0, 0),
    ] {
        let signed = SignedScalars {
            byte,
            short,
            int,
            long,
            letter: 'z',
        };
        let decoded: SignedScalars = deserialize(&serialize(&signed).unwrap()).unwrap();
        assert_eq!(decoded, signed);

        let fixed = FixedScalars {
            byte,
            short,
            int,
            long,
            letter: char::MAX,
        };
        let decoded: FixedScalars = deserialize(&serialize(&fixed).unwrap()).unwrap();
        assert_eq!(decoded, fixed);
    }
}

#[test]
fn test_signed_encoding_is_compact_for_negatives() {
    let signed = SignedScalars {
        int: -1,
        ..Default::default()
    };
    let plain = Scalars {
        int: -1,
        ..Default::default()
    };
    // zigzag(-1) is one byte; the plain varint is sign-extended to ten
    let signed_len = serialize(&signed).unwrap().len();
    let plain_len = serialize(&plain).unwrap().len();
    assert!(signed_len < plain_len);
}

#[test]
fn test_float_special_values() {
    let value = Scalars {
        float: f32::INFINITY,
        double: f64::NAN,
        ..Default::default()
    };
    let decoded: Scalars = deserialize(&serialize(&value).unwrap()).unwrap();
    assert_eq!(decoded.float, f32::INFINITY);
    assert!(decoded.double.is_nan());
}

// =============================================================================
// Optional fields
// =============================================================================

#[derive(Message, Default, Debug, PartialEq)]
struct Optionals {
    #[tagwire(field = 1)]
    id: Option<i64>,
    #[tagwire(field = 2)]
    name: Option<String>,
    #[tagwire(field = 3)]
    scores: Option<Vec<f32>>,
}

#[test]
fn test_none_fields_are_omitted() {
    let bytes = serialize(&Optionals::default()).unwrap();
    assert_eq!(&bytes[..], &[0x00]);
    let decoded: Optionals = deserialize(&bytes).unwrap();
    assert_eq!(decoded, Optionals::default());
}

#[test]
fn test_some_fields_round_trip() {
    let value = Optionals {
        id: Some(0),
        name: Some(String::new()),
        scores: Some(vec![1.0, 2.5]),
    };
    let decoded: Optionals = deserialize(&serialize(&value).unwrap()).unwrap();
    assert_eq!(decoded, value);
}

// =============================================================================
// Collections and maps
// =============================================================================

#[derive(Message, Default, Debug, PartialEq)]
struct Collections {
    #[tagwire(field = 1)]
    list: Vec<String>,
    #[tagwire(field = 2, encoding = "signed")]
    deque: VecDeque<i64>,
    #[tagwire(field = 3)]
    set: HashSet<i32>,
    #[tagwire(field = 4)]
    sorted: BTreeSet<String>,
    #[tagwire(field = 5)]
    map: HashMap<String, Vec<i32>>,
    #[tagwire(field = 6, encoding = "fixed")]
    sorted_map: BTreeMap<i32, f64>,
    #[tagwire(field = 7)]
    nested: Vec<Vec<i8>>,
}

#[test]
fn test_collections_round_trip() {
    let mut value = Collections {
        list: vec!["a".into(), String::new(), "ccc".into()],
        deque: VecDeque::from(vec![-1, 0, i64::MAX]),
        set: [1, 2, 3].into_iter().collect(),
        sorted: ["x".to_string(), "y".to_string()].into_iter().collect(),
        sorted_map: [(-5, 0.5), (7, 1e300)].into_iter().collect(),
        nested: vec![vec![], vec![-1, 1], vec![i8::MIN]],
        ..Default::default()
    };
    value.map.insert("evens".into(), vec![2, 4, 6]);
    value.map.insert("empty".into(), vec![]);

    let decoded: Collections = deserialize(&serialize(&value).unwrap()).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_empty_collections_round_trip() {
    let value = Collections::default();
    let decoded: Collections = deserialize(&serialize(&value).unwrap()).unwrap();
    assert_eq!(decoded, value);
}

#[derive(Message, Default, Debug, PartialEq)]
struct PrimitiveContainers {
    #[tagwire(field = 1)]
    by_id: IntMap<String>,
    #[tagwire(field = 2, encoding = "signed")]
    seen: LongSet,
}

#[test]
fn test_primitive_containers_round_trip() {
    let mut value = PrimitiveContainers::default();
    value.by_id.put(1, "one".into());
    value.by_id.put(-2, "minus two".into());
    value.seen.add(i64::MIN);
    value.seen.add(42);

    let decoded: PrimitiveContainers = deserialize(&serialize(&value).unwrap()).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(decoded.by_id.get(-2).map(String::as_str), Some("minus two"));
}

#[derive(Message, Default, Debug, PartialEq)]
struct PlainMapView {
    #[tagwire(field = 1)]
    by_id: BTreeMap<i32, String>,
}

#[test]
fn test_primitive_map_reads_as_plain_map() {
    let mut value = PrimitiveContainers::default();
    value.by_id.put(3, "three".into());
    let decoded: PlainMapView = deserialize(&serialize(&value).unwrap()).unwrap();
    assert_eq!(decoded.by_id.get(&3).map(String::as_str), Some("three"));
}

// =============================================================================
// Enums
// =============================================================================

#[derive(WireEnum, Clone, Copy, Debug, PartialEq, Default)]
enum Side {
    #[default]
    Buy,
    Sell,
    #[tagwire(id = 10)]
    Cross,
    #[tagwire(id = -3)]
    Cancelled,
}

#[derive(Message, Default, Debug, PartialEq)]
struct Order {
    #[tagwire(field = 1)]
    side: Side,
    #[tagwire(field = 2, encoding = "fixed")]
    history: Vec<Side>,
    #[tagwire(field = 3)]
    by_side: BTreeMap<String, Side>,
}

#[test]
fn test_enum_ids() {
    assert_eq!(Side::Buy.to_wire(), 0);
    assert_eq!(Side::Sell.to_wire(), 1);
    assert_eq!(Side::Cross.to_wire(), 10);
    assert_eq!(Side::Cancelled.to_wire(), -3);
    assert_eq!(Side::from_wire(10), Some(Side::Cross));
    assert_eq!(Side::from_wire(2), None);
    assert_eq!(Side::NAME, "Side");
}

#[test]
fn test_enums_round_trip() {
    let mut value = Order {
        side: Side::Cancelled,
        history: vec![Side::Buy, Side::Cross, Side::Cancelled],
        ..Default::default()
    };
    value.by_side.insert("last".into(), Side::Sell);
    let decoded: Order = deserialize(&serialize(&value).unwrap()).unwrap();
    assert_eq!(decoded, value);
}

// =============================================================================
// Nested and recursive messages
// =============================================================================

#[derive(Message, Default, Debug, PartialEq, Clone)]
struct Address {
    #[tagwire(field = 1)]
    street: String,
    #[tagwire(field = 2)]
    zip: Option<i32>,
}

#[derive(Message, Default, Debug, PartialEq)]
struct Customer {
    #[tagwire(field = 1)]
    name: String,
    #[tagwire(field = 2)]
    home: Address,
    #[tagwire(field = 3)]
    work: Option<Address>,
    #[tagwire(field = 4)]
    previous: Vec<Address>,
    #[tagwire(field = 5)]
    by_label: HashMap<String, Address>,
}

#[test]
fn test_nested_round_trip() {
    let home = Address {
        street: "1 Main St".into(),
        zip: Some(12345),
    };
    let mut value = Customer {
        name: "Ada".into(),
        home: home.clone(),
        work: None,
        previous: vec![Address::default(), home.clone()],
        ..Default::default()
    };
    value.by_label.insert("home".into(), home);
    let decoded: Customer = deserialize(&serialize(&value).unwrap()).unwrap();
    assert_eq!(decoded, value);
}

#[derive(Message, Default, Debug, PartialEq)]
struct TreeNode {
    #[tagwire(field = 1)]
    value: i32,
    #[tagwire(field = 2)]
    children: Vec<TreeNode>,
}

#[derive(Message, Default, Debug, PartialEq)]
struct ListNode {
    #[tagwire(field = 1)]
    value: String,
    #[tagwire(field = 2)]
    next: Option<Box<ListNode>>,
}

#[test]
fn test_recursive_types_round_trip() {
    let tree = TreeNode {
        value: 1,
        children: vec![
            TreeNode {
                value: 2,
                children: vec![TreeNode {
                    value: 4,
                    children: vec![],
                }],
            },
            TreeNode {
                value: 3,
                children: vec![],
            },
        ],
    };
    let decoded: TreeNode = deserialize(&serialize(&tree).unwrap()).unwrap();
    assert_eq!(decoded, tree);

    let list = ListNode {
        value: "head".into(),
        next: Some(Box::new(ListNode {
            value: "tail".into(),
            next: None,
        })),
    };
    let decoded: ListNode = deserialize(&serialize(&list).unwrap()).unwrap();
    assert_eq!(decoded, list);
}

// =============================================================================
// Flatten, skip and accessors
// =============================================================================

#[derive(Message, Default, Debug, PartialEq)]
struct Entity {
    #[tagwire(field = 1)]
    id: i64,
    #[tagwire(field = 2)]
    version: i32,
}

#[derive(Message, Default, Debug, PartialEq)]
struct Account {
    #[tagwire(flatten)]
    entity: Entity,
    #[tagwire(field = 10)]
    owner: String,
    #[tagwire(skip)]
    cached_len: usize,
}

#[test]
fn test_flattened_fields_share_the_field_stream() {
    let value = Account {
        entity: Entity { id: 7, version: 2 },
        owner: "bob".into(),
        cached_len: 99,
    };
    let bytes = serialize(&value).unwrap();
    // Entity's fields appear inline, not as a nested object
    let entity: Entity = deserialize(&bytes).unwrap();
    assert_eq!(entity, Entity { id: 7, version: 2 });

    let decoded: Account = deserialize(&bytes).unwrap();
    assert_eq!(decoded.entity, value.entity);
    assert_eq!(decoded.owner, "bob");
    assert_eq!(decoded.cached_len, 0);
}

#[derive(Message, Default, Debug, PartialEq)]
struct Celsius {
    #[tagwire(field = 1, getter = "Celsius::tenths", setter = "Celsius::set_tenths")]
    tenths: i32,
    #[tagwire(field = 2, getter = "Celsius::label", setter = "Celsius::set_label")]
    label: Option<String>,
}

impl Celsius {
    fn tenths(&self) -> &i32 {
        &self.tenths
    }

    fn set_tenths(&mut self, value: i32) {
        self.tenths = value.clamp(-2730, i32::MAX);
    }

    fn label(&self) -> Option<&String> {
        self.label.as_ref().filter(|l| !l.is_empty())
    }

    fn set_label(&mut self, value: String) {
        self.label = Some(value.to_uppercase());
    }
}

#[test]
fn test_accessor_functions() {
    let value = Celsius {
        tenths: -5000,
        label: Some("cold".into()),
    };
    let decoded: Celsius = deserialize(&serialize(&value).unwrap()).unwrap();
    assert_eq!(decoded.tenths, -2730);
    assert_eq!(decoded.label.as_deref(), Some("COLD"));

    let blank = Celsius {
        tenths: 0,
        label: Some(String::new()),
    };
    let decoded: Celsius = deserialize(&serialize(&blank).unwrap()).unwrap();
    assert_eq!(decoded.label, None);
}

// =============================================================================
// Facade entry points
// =============================================================================

#[test]
fn test_stream_round_trip() {
    let value = Customer {
        name: "x".repeat(10_000),
        previous: vec![Address::default(); 50],
        ..Default::default()
    };
    let serializer = Serializer::new();
    let mut sink = Vec::new();
    let written = serializer.serialize_into(&value, &mut sink).unwrap();
    assert_eq!(written, sink.len() as u64);
    assert_eq!(&sink[..], &serializer.serialize(&value).unwrap()[..]);

    let decoded: Customer = serializer.deserialize_from(&sink[..]).unwrap();
    assert_eq!(decoded, value);

    // a tiny internal buffer forces many refills
    let mut reader = StreamReader::with_capacity(8, &sink[..]);
    let decoded: Customer = serializer.decode_from(&mut reader).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_back_to_back_messages() {
    let first = Entity { id: 1, version: 1 };
    let second = Entity { id: 2, version: 5 };
    let serializer = Serializer::new().with_limits(Limits::default());
    let mut buf = serializer.serialize(&first).unwrap().to_vec();
    buf.extend_from_slice(&serializer.serialize(&second).unwrap());

    let mut reader = BufferReader::new(&buf[..]);
    let a: Entity = serializer.decode_from(&mut reader).unwrap();
    let b: Entity = serializer.decode_from(&mut reader).unwrap();
    assert_eq!((a, b), (first, second));
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn test_bytes_input_is_shared() {
    let value = Scalars {
        blob: Bytes::from(vec![9u8; 64]),
        ..Default::default()
    };
    let input = serialize(&value).unwrap();
    let decoded: Scalars = Serializer::new().deserialize_buf(input.clone()).unwrap();
    assert_eq!(decoded.blob, value.blob);
    let start = input.as_ptr() as usize;
    let end = start + input.len();
    let blob = decoded.blob.as_ptr() as usize;
    assert!(blob >= start && blob < end);
}
