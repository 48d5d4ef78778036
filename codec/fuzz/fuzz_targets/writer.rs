#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use compactbin_codec::{load, validate, Limits, ValidateMode, Value, Writer};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Arbitrary, Debug)]
enum Node {
    Null,
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f32),
    Binary(Vec<u8>),
    String(String),
    Hash([u8; 32]),
    Uuid(u128),
    DateTime(i64),
    Array(Vec<Node>),
    Object(BTreeMap<String, Node>),
}

impl Node {
    fn to_value(&self) -> Value {
        match self {
            Node::Null => Value::Null,
            Node::Bool(value) => Value::Bool(*value),
            Node::Integer(value) => Value::Integer(*value),
            Node::Unsigned(value) if *value > i64::MAX as u64 => Value::UnsignedInteger(*value),
            Node::Unsigned(value) => Value::Integer(*value as i64),
            Node::Float(value) => Value::Float32(*value),
            Node::Binary(value) => Value::Binary(Bytes::copy_from_slice(value)),
            Node::String(value) => Value::String(value.clone()),
            Node::Hash(value) => Value::Hash(*value),
            Node::Uuid(value) => Value::Uuid(Uuid::from_u128(*value)),
            Node::DateTime(value) => Value::DateTime(*value),
            Node::Array(elements) => Value::Array(elements.iter().map(Node::to_value).collect()),
            // Keys are unique; the prefix keeps them non-empty
            Node::Object(members) => Value::Object(
                members
                    .iter()
                    .map(|(name, member)| (format!("m{name}"), member.to_value()))
                    .collect(),
            ),
        }
    }
}

fuzz_target!(|node: Node| {
    let value = node.to_value();
    let limits = Limits {
        max_depth: usize::MAX,
        ..Limits::default()
    };

    let mut writer = Writer::new();
    writer.value(&value);
    let field = writer.save();
    validate(field.as_bytes(), None, ValidateMode::all(), &limits)
        .expect("writer output must validate");

    let mut stream = Vec::new();
    writer.save_to(&mut stream).expect("writing to a vec cannot fail");
    let loaded = load(&mut stream.as_slice(), &limits).expect("load failed");
    assert_eq!(loaded, field);

    // NaN never equals itself, so compare the re-encoded bytes instead of the values
    let decoded = Value::from(&loaded);
    assert_eq!(decoded.to_field(), field);
});
