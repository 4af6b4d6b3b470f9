//! End-to-end scenarios through the registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::thread;

use bsonic_core::polymorphic::{AllowList, AllowPolicy, NominalType, Record, TypeName, Value};
use bsonic_core::{
    decode_field, decode_from_bson, doc, encode_field, encode_to_bson, Binary, BinarySubtype, Bson,
    BsonEnum, CodecOptions, CodecRegistry, Config, DateTime, DateTimeKind, Decimal128,
    DictionaryRepresentation, ErrorKind, GuidMode, GuidModeGuard, GuidRepresentation,
    ObjectId, RegistrySettings, Representation, Stack, TimeOfDay, TimeUnit,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, BsonEnum)]
#[repr(u8)]
enum Priority {
    Low = 1,
    #[bson(rename = "URGENT")]
    High = 9,
}

#[derive(Debug, Clone, Copy, PartialEq, BsonEnum)]
enum Plain {
    A,
    B,
}

fn with(representation: Representation) -> CodecOptions {
    CodecOptions::new().with_representation(representation)
}

#[test]
fn boolean_as_decimal() {
    let registry = CodecRegistry::new();
    let codec = registry.get_codec::<bool>(&with(Representation::Decimal128)).unwrap();

    let document = encode_field(codec.as_ref(), "flag", &true).unwrap();
    assert_eq!(document, doc! { "flag" => Decimal128::ONE });
    assert!(decode_field(codec.as_ref(), "flag", &document).unwrap());
}

#[test]
fn long_max_into_int32_overflows() {
    let registry = CodecRegistry::new();
    let codec = registry.get_codec::<i64>(&with(Representation::Int32)).unwrap();

    let err = encode_field(codec.as_ref(), "count", &i64::MAX).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Overflow);
    assert_eq!(err.path(), vec!["count"]);

    let lenient = registry
        .get_codec::<i64>(&with(Representation::Int32).with_allow_overflow(true))
        .unwrap();
    assert_eq!(encode_to_bson(lenient.as_ref(), &i64::MAX).unwrap(), Bson::Int32(-1));
}

#[test]
fn min_date_as_string() {
    let registry = CodecRegistry::new();
    let options = with(Representation::String).with_kind(DateTimeKind::Utc);
    let codec = registry.get_codec::<DateTime>(&options).unwrap();

    let value = DateTime::MIN.specify_kind(DateTimeKind::Utc);
    let encoded = encode_to_bson(codec.as_ref(), &value).unwrap();
    assert_eq!(encoded, Bson::String("0001-01-01T00:00:00".into()));

    let decoded = decode_from_bson(codec.as_ref(), encoded).unwrap();
    assert_eq!(decoded.ticks(), 0);
    assert_eq!(decoded.kind(), DateTimeKind::Utc);
}

#[test]
fn null_bson_value_uses_the_marker() {
    let registry = CodecRegistry::new();
    let codec = registry.get_codec::<Option<Bson>>(&CodecOptions::default()).unwrap();

    let document = encode_field(codec.as_ref(), "b", &None).unwrap();
    assert_eq!(document, doc! { "b" => doc! { "_csharpnull" => true } });
    assert_eq!(decode_field(codec.as_ref(), "b", &document).unwrap(), None);

    let legacy = doc! { "b" => doc! { "$csharpnull" => true } };
    assert_eq!(decode_field(codec.as_ref(), "b", &legacy).unwrap(), None);

    let present = encode_field(codec.as_ref(), "b", &Some(Bson::Null)).unwrap();
    assert_eq!(present, doc! { "b" => Bson::Null });
    assert_eq!(decode_field(codec.as_ref(), "b", &present).unwrap(), Some(Bson::Null));
}

#[test]
fn stack_keeps_its_order() {
    let registry = CodecRegistry::new();
    let codec = registry.get_codec::<Stack<i32>>(&CodecOptions::default()).unwrap();

    let mut stack = Stack::new();
    stack.push(1);
    stack.push(2);

    let encoded = encode_to_bson(codec.as_ref(), &stack).unwrap();
    assert_eq!(encoded, Bson::Array(vec![Bson::Int32(2), Bson::Int32(1)]));

    let mut decoded = decode_from_bson(codec.as_ref(), encoded).unwrap();
    assert_eq!(decoded.pop(), Some(2));
    assert_eq!(decoded.pop(), Some(1));
}

#[test]
fn derived_enums() {
    let registry = CodecRegistry::new();

    let numeric = registry.get_codec::<Priority>(&CodecOptions::default()).unwrap();
    assert_eq!(encode_to_bson(numeric.as_ref(), &Priority::High).unwrap(), Bson::Int32(9));
    let err = decode_from_bson(numeric.as_ref(), Bson::Int32(300)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Overflow);

    let named = registry.get_codec::<Priority>(&with(Representation::String)).unwrap();
    assert_eq!(
        encode_to_bson(named.as_ref(), &Priority::High).unwrap(),
        Bson::String("URGENT".into())
    );
    assert_eq!(
        decode_from_bson(named.as_ref(), Bson::String("urgent".into())).unwrap(),
        Priority::High
    );
    assert_eq!(
        decode_from_bson(named.as_ref(), Bson::String("Low".into())).unwrap(),
        Priority::Low
    );

    let plain = registry.get_codec::<Plain>(&with(Representation::Int64)).unwrap();
    assert_eq!(encode_to_bson(plain.as_ref(), &Plain::B).unwrap(), Bson::Int64(1));
    assert_eq!(decode_from_bson(plain.as_ref(), Bson::Int64(0)).unwrap(), Plain::A);
    assert!(registry.get_codec::<Plain>(&with(Representation::Double)).is_err());
}

#[test]
fn dictionary_keys_must_be_strings_in_documents() {
    let registry = CodecRegistry::new();

    let by_name = registry.get_codec::<BTreeMap<String, i32>>(&CodecOptions::default()).unwrap();
    let map = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);
    let encoded = encode_to_bson(by_name.as_ref(), &map).unwrap();
    assert_eq!(encoded, Bson::Document(doc! { "a" => 1i32, "b" => 2i32 }));
    assert_eq!(decode_from_bson(by_name.as_ref(), encoded).unwrap(), map);

    let by_number = registry.get_codec::<HashMap<i32, String>>(&CodecOptions::default()).unwrap();
    let numbered = HashMap::from([(1, "one".to_string())]);
    let err = encode_to_bson(by_number.as_ref(), &numbered).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);

    let pairs = registry
        .get_codec::<HashMap<i32, String>>(
            &CodecOptions::new().with_dictionary_representation(DictionaryRepresentation::ArrayOfArrays),
        )
        .unwrap();
    let encoded = encode_to_bson(pairs.as_ref(), &numbered).unwrap();
    assert_eq!(
        encoded,
        Bson::Array(vec![Bson::Array(vec![Bson::Int32(1), Bson::String("one".into())])])
    );
    assert_eq!(decode_from_bson(pairs.as_ref(), encoded).unwrap(), numbered);
}

#[test]
fn discriminated_values_from_config() {
    let config = Config::from_toml_str(
        r#"
        [registry]
        allowed_types = { serialize = "all", deserialize = { types = ["zoo.Cat"] } }

        [[registry.types]]
        name = "zoo.Cat"
        implements = ["zoo.Animal"]

        [[registry.types]]
        name = "zoo.Dog"
        implements = ["zoo.Animal"]
        "#,
    )
    .unwrap();
    let registry = CodecRegistry::with_settings(config.registry).unwrap();
    let animal = NominalType::of(TypeName::new("zoo", "Animal"));
    let codec = registry.get_dynamic_codec(&animal, &CodecOptions::default()).unwrap();

    let cat = Value::Object(Record::new(TypeName::new("zoo", "Cat")).with_field("name", "Tom"));
    let encoded = encode_to_bson(codec.as_ref(), &cat).unwrap();
    let wrapper = encoded.as_document().unwrap();
    assert_eq!(wrapper.keys().collect::<Vec<_>>(), vec!["_t", "_v"]);
    assert_eq!(wrapper.get("_t"), Some(&Bson::String("Cat".into())));
    assert_eq!(decode_from_bson(codec.as_ref(), encoded).unwrap(), cat);

    // written fine, but not on the read side's list
    let dog = Value::Object(Record::new(TypeName::new("zoo", "Dog")));
    let encoded = encode_to_bson(codec.as_ref(), &dog).unwrap();
    let err = decode_from_bson(codec.as_ref(), encoded).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
}

#[test]
fn builtin_only_by_default() {
    let registry = CodecRegistry::with_settings(RegistrySettings {
        types: vec![bsonic_core::TypeConfig {
            name: "zoo.Cat".into(),
            implements: vec![],
            always_discriminated: true,
        }],
        ..RegistrySettings::default()
    })
    .unwrap();
    let codec = registry.get_object_codec(&NominalType::Any).unwrap();

    let cat = Value::Object(Record::new(TypeName::new("zoo", "Cat")));
    assert!(encode_to_bson(codec.as_ref(), &cat).is_err());
    assert_eq!(
        encode_to_bson(codec.as_ref(), &Value::Int64(5)).unwrap(),
        Bson::Int64(5)
    );

    let open = CodecRegistry::with_settings(
        registry
            .settings()
            .clone()
            .with_allowed_types(AllowList::symmetric(AllowPolicy::All)),
    )
    .unwrap();
    let codec = open.get_object_codec(&NominalType::Any).unwrap();
    assert!(encode_to_bson(codec.as_ref(), &cat).is_ok());
}

#[test]
fn registry_is_shared_across_threads() {
    let registry = Arc::new(CodecRegistry::new());
    let options = with(Representation::String);

    let codecs: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.get_codec::<Vec<i64>>(&options).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for codec in &codecs[1..] {
        assert!(Arc::ptr_eq(&codecs[0], codec));
    }
    let encoded = encode_to_bson(codecs[0].as_ref(), &vec![1i64, 2]).unwrap();
    assert_eq!(
        encoded,
        Bson::Array(vec![Bson::String("1".into()), Bson::String("2".into())])
    );
}

#[test]
fn legacy_guids_follow_the_captured_mode() {
    let guid = Uuid::parse_str("01020304-0506-0708-090a-0b0c0d0e0f10").unwrap();

    let settings = {
        let _guard = GuidModeGuard::set(GuidMode::V2 {
            default_representation: GuidRepresentation::CSharpLegacy,
        });
        RegistrySettings::default().with_global_guid_mode()
    };
    let registry = CodecRegistry::with_settings(settings).unwrap();

    let codec = registry.get_codec::<Uuid>(&CodecOptions::default()).unwrap();
    let encoded = encode_to_bson(codec.as_ref(), &guid).unwrap();
    assert_eq!(
        encoded,
        Bson::Binary(Binary::new(
            BinarySubtype::UuidLegacy,
            vec![4, 3, 2, 1, 6, 5, 8, 7, 9, 10, 11, 12, 13, 14, 15, 16]
        ))
    );
    assert_eq!(decode_from_bson(codec.as_ref(), encoded).unwrap(), guid);

    let strict = CodecRegistry::new();
    let codec = strict.get_codec::<Uuid>(&CodecOptions::default()).unwrap();
    assert!(encode_to_bson(codec.as_ref(), &guid).is_err());
}

#[test]
fn times_of_day_in_a_document() {
    let registry = CodecRegistry::new();
    let value = TimeOfDay::from_hms(13, 24, 53).unwrap();

    let ticks = registry.get_codec::<TimeOfDay>(&CodecOptions::default()).unwrap();
    let document = encode_field(ticks.as_ref(), "at", &value).unwrap();
    assert_eq!(document, doc! { "at" => 482_930_000_000i64 });

    let minutes = registry
        .get_codec::<TimeOfDay>(&CodecOptions::new().with_time_unit(TimeUnit::Minutes))
        .unwrap();
    let document = encode_field(minutes.as_ref(), "at", &value).unwrap();
    assert_eq!(document, doc! { "at" => 804i64 });

    let err = decode_field(minutes.as_ref(), "at", &doc! { "at" => 1440i64 }).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert_eq!(err.path(), vec!["at"]);

    let text = registry.get_codec::<TimeOfDay>(&with(Representation::String)).unwrap();
    let document = encode_field(text.as_ref(), "at", &value).unwrap();
    assert_eq!(document, doc! { "at" => "13:24:53.0000000" });
    assert_eq!(decode_field(text.as_ref(), "at", &document).unwrap(), value);
}

#[test]
fn string_ids_from_config() {
    let options: CodecOptions = toml::from_str(r#"representation = "object_id""#).unwrap();
    let registry = CodecRegistry::new();
    let codec = registry.get_codec::<Vec<String>>(&options).unwrap();

    let ids = vec!["000000000000000000000001".to_string()];
    let encoded = encode_to_bson(codec.as_ref(), &ids).unwrap();
    let expected: ObjectId = "000000000000000000000001".parse().unwrap();
    assert_eq!(encoded, Bson::Array(vec![Bson::ObjectId(expected)]));
    assert_eq!(decode_from_bson(codec.as_ref(), encoded).unwrap(), ids);

    let err = encode_to_bson(codec.as_ref(), &vec!["xyz".to_string()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert_eq!(err.path(), vec!["0"]);
}
