use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tagwire::{
    deserialize, message_field_type, serialize, AccessError, CodecError, IntEncoding, Message,
    Registry, ScalarKind, SchemaBuilder, SchemaError, Serializer, Shape, TypeDescriptor, Value,
};

// =============================================================================
// Schema validation
// =============================================================================

#[derive(Message, Default, Debug, PartialEq)]
struct Base {
    #[tagwire(field = 1)]
    id: i64,
}

#[derive(Message, Default, Debug, PartialEq)]
struct Clashing {
    #[tagwire(flatten)]
    base: Base,
    #[tagwire(field = 1)]
    other: String,
}

#[test]
fn test_duplicate_number_through_flatten() {
    let err = serialize(&Clashing::default()).unwrap_err();
    match err {
        CodecError::Schema(SchemaError::DuplicateFieldNumber {
            type_name,
            number,
            first,
            second,
        }) => {
            assert_eq!(type_name, "Clashing");
            assert_eq!(number, 1);
            let mut names = [first, second];
            names.sort();
            assert_eq!(names, ["id", "other"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Schema errors are raised again on every use, never cached as a descriptor
    assert!(deserialize::<Clashing>(&[0x00]).is_err());
    assert!(!Registry::global().contains::<Clashing>());
}

#[derive(Default)]
struct ZeroNumber {
    value: i32,
}

impl Message for ZeroNumber {
    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema.name("ZeroNumber").field(
            0,
            "value",
            IntEncoding::Varint,
            |m| Some(&m.value),
            |m, v| m.value = v,
        );
    }
}

#[derive(Default)]
struct HugeNumber {
    value: i32,
}

impl Message for HugeNumber {
    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema.name("HugeNumber").field(
            1 << 28,
            "value",
            IntEncoding::Varint,
            |m| Some(&m.value),
            |m, v| m.value = v,
        );
    }
}

#[test]
fn test_field_number_out_of_range() {
    for err in [
        serialize(&ZeroNumber::default()).unwrap_err(),
        serialize(&HugeNumber::default()).unwrap_err(),
    ] {
        assert!(matches!(
            err,
            CodecError::Schema(SchemaError::InvalidFieldNumber {
                max: 268_435_455,
                ..
            })
        ));
    }
}

#[derive(Message, Default)]
struct FixedString {
    #[tagwire(field = 1, encoding = "fixed")]
    name: String,
}

#[test]
fn test_integer_encoding_on_non_integral_field() {
    let err = TypeDescriptor::<FixedString>::build().unwrap_err();
    assert!(matches!(
        err,
        SchemaError::UnsupportedShape { field: "name", .. }
    ));
}

#[derive(Default)]
struct BadPrimitiveMap {
    names: Vec<(String, i32)>,
}

impl Message for BadPrimitiveMap {
    fn describe(schema: &mut SchemaBuilder<Self>) {
        let shape = Shape::PrimitiveMap(
            Arc::new(Shape::String),
            Arc::new(Shape::Scalar(ScalarKind::Int, IntEncoding::Varint)),
        );
        schema.raw_field(
            1,
            "names",
            shape,
            |m| {
                Some(Value::Map(
                    m.names
                        .iter()
                        .map(|(k, v)| (Value::Str(k.as_str().into()), Value::Int(*v)))
                        .collect(),
                ))
            },
            |_, _| Ok(()),
        );
    }
}

#[test]
fn test_primitive_map_rejects_string_keys() {
    let err = TypeDescriptor::<BadPrimitiveMap>::build().unwrap_err();
    assert!(matches!(
        err,
        SchemaError::UnsupportedShape { field: "names", .. }
    ));
}

#[derive(Default)]
struct RawNested {
    bases: Vec<Base>,
}

impl Message for RawNested {
    fn describe(schema: &mut SchemaBuilder<Self>) {
        let shape = Shape::List(Arc::new(tagwire::schema::message_shape::<Base>()));
        schema.raw_field(
            1,
            "bases",
            shape,
            |m| (!m.bases.is_empty()).then(|| Value::Collection(Vec::new())),
            |_, _| Ok(()),
        );
    }
}

#[test]
fn test_raw_field_rejects_nested_objects() {
    let err = TypeDescriptor::<RawNested>::build().unwrap_err();
    assert!(matches!(
        err,
        SchemaError::UnsupportedShape {
            field: "bases",
            reason: "raw fields cannot hold nested objects",
            ..
        }
    ));
}

#[test]
fn test_descriptor_fields_sorted_by_number() {
    #[derive(Message, Default)]
    struct Unsorted {
        #[tagwire(field = 9)]
        c: bool,
        #[tagwire(field = 2)]
        a: bool,
        #[tagwire(field = 5, encoding = "signed")]
        b: i32,
    }

    let descriptor = TypeDescriptor::<Unsorted>::build().unwrap();
    let numbers: Vec<u32> = descriptor.fields().iter().map(|f| f.number()).collect();
    assert_eq!(numbers, [2, 5, 9]);
    let b = descriptor.field(5).unwrap();
    assert_eq!(b.name(), "b");
    assert_eq!(
        b.shape(),
        &Shape::Scalar(ScalarKind::Int, IntEncoding::SignedVarint)
    );
    assert!(descriptor.field(3).is_none());
}

// =============================================================================
// Hand-written schemas and registries
// =============================================================================

#[derive(Default, Debug, PartialEq)]
struct Temperature {
    millis: i64,
    unit: String,
}

impl Message for Temperature {
    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .name("Temperature")
            .field(
                1,
                "millis",
                IntEncoding::SignedVarint,
                |m| Some(&m.millis),
                |m, v| m.millis = v,
            )
            .raw_field(
                2,
                "unit",
                Shape::String,
                |m| (!m.unit.is_empty()).then(|| Value::Str(m.unit.as_str().into())),
                |m, value| match value {
                    Value::Str(s) => {
                        m.unit = s.into_owned();
                        Ok(())
                    }
                    other => Err(AccessError::ShapeMismatch {
                        expected: "string",
                        found: other.kind_name(),
                    }),
                },
            );
    }
}

message_field_type!(Temperature);

#[derive(Message, Default, Debug, PartialEq)]
struct Reading {
    #[tagwire(field = 1)]
    sensor: String,
    #[tagwire(field = 2)]
    temperatures: Vec<Temperature>,
}

#[test]
fn test_hand_written_message_nests_in_derived() {
    let value = Reading {
        sensor: "roof".into(),
        temperatures: vec![
            Temperature {
                millis: -1500,
                unit: "C".into(),
            },
            Temperature {
                millis: 300,
                unit: String::new(),
            },
        ],
    };
    let bytes = serialize(&value).unwrap();
    let decoded: Reading = deserialize(&bytes).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_empty_raw_field_is_omitted() {
    let bytes = serialize(&Temperature {
        millis: 1,
        unit: String::new(),
    })
    .unwrap();
    assert_eq!(&bytes[..], &[0x10, 0x02, 0x00]);
}

#[test]
fn test_private_registry() {
    let registry = Arc::new(Registry::new());
    assert!(registry.is_empty());
    let registered = registry.register(TypeDescriptor::<Temperature>::build().unwrap());
    assert!(registry.contains::<Temperature>());

    let serializer = Serializer::new().with_registry(Arc::clone(&registry));
    let value = Temperature {
        millis: 42,
        unit: "K".into(),
    };
    let decoded: Temperature = serializer
        .deserialize(&serializer.serialize(&value).unwrap())
        .unwrap();
    assert_eq!(decoded, value);
    assert!(Arc::ptr_eq(
        &registered,
        &registry.resolve::<Temperature>().unwrap()
    ));

    // a second registration keeps the installed descriptor
    let again = registry.register(TypeDescriptor::<Temperature>::build().unwrap());
    assert!(Arc::ptr_eq(&registered, &again));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_nested_types_resolve_lazily() {
    let registry = Arc::new(Registry::new());
    let serializer = Serializer::new().with_registry(Arc::clone(&registry));
    serializer.serialize(&Reading::default()).unwrap();
    assert!(registry.contains::<Reading>());
    assert!(!registry.contains::<Temperature>());

    serializer
        .serialize(&Reading {
            temperatures: vec![Temperature::default()],
            ..Default::default()
        })
        .unwrap();
    assert!(registry.contains::<Temperature>());
}

#[test]
fn test_concurrent_resolution_shares_one_descriptor() {
    let registry = Arc::new(Registry::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.resolve::<Reading>().unwrap())
        })
        .collect();
    let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for descriptor in &descriptors[1..] {
        assert!(Arc::ptr_eq(&descriptors[0], descriptor));
    }
    assert_eq!(registry.len(), 1);
}

// =============================================================================
// Lifecycle hooks
// =============================================================================

#[derive(Message, Default, Debug)]
#[tagwire(after_deserialize = "Self::rebuild_total")]
struct Invoice {
    #[tagwire(field = 1)]
    lines: Vec<i64>,
    #[tagwire(skip)]
    total: i64,
}

impl Invoice {
    fn rebuild_total(&mut self) {
        self.total = self.lines.iter().sum();
    }
}

#[test]
fn test_after_deserialize_rebuilds_derived_state() {
    let bytes = serialize(&Invoice {
        lines: vec![10, 20, 12],
        total: 0,
    })
    .unwrap();
    let decoded: Invoice = deserialize(&bytes).unwrap();
    assert_eq!(decoded.total, 42);
}

static SERIALIZED: AtomicUsize = AtomicUsize::new(0);
static FINISHED: AtomicUsize = AtomicUsize::new(0);

#[derive(Message, Default, Debug)]
#[tagwire(before_serialize = "count_serialize", after_serialize = "count_finished")]
struct Audited {
    #[tagwire(field = 1)]
    note: String,
}

fn count_serialize(_: &Audited) {
    SERIALIZED.fetch_add(1, Ordering::SeqCst);
}

fn count_finished(_: &Audited) {
    FINISHED.fetch_add(1, Ordering::SeqCst);
}

#[derive(Message, Default, Debug)]
struct AuditLog {
    #[tagwire(field = 1)]
    entries: Vec<Audited>,
}

#[test]
fn test_serialize_hooks_run_for_nested_objects() {
    let log = AuditLog {
        entries: vec![Audited::default(), Audited::default(), Audited::default()],
    };
    serialize(&log).unwrap();
    assert_eq!(SERIALIZED.load(Ordering::SeqCst), 3);
    assert_eq!(FINISHED.load(Ordering::SeqCst), 3);
}

#[derive(Message, Default, Debug, PartialEq)]
#[tagwire(before_deserialize = "Self::reset")]
struct Preset {
    #[tagwire(field = 1)]
    mode: String,
}

impl Preset {
    fn reset(&mut self) {
        self.mode = "auto".into();
    }
}

#[test]
fn test_before_deserialize_sets_fallback_values() {
    let decoded: Preset = deserialize(&[0x00]).unwrap();
    assert_eq!(decoded.mode, "auto");

    let bytes = serialize(&Preset {
        mode: "manual".into(),
    })
    .unwrap();
    let decoded: Preset = deserialize(&bytes).unwrap();
    assert_eq!(decoded.mode, "manual");
}
