//! Render fields as JSON.

use crate::{Field, FieldValue, Object};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use compactbin_utils::hex;
use serde_json::{Map, Number, Value as Json};

impl Field {
    /// Converts the field's value to JSON.
    ///
    /// Binary data becomes base64, hashes become lowercase hex, and UUIDs use their hyphenated
    /// form. Date-times and time spans are emitted as tick counts. Floats that are not finite
    /// have no JSON form and become `null`.
    pub fn to_json(&self) -> Json {
        match self.value() {
            FieldValue::Null => Json::Null,
            FieldValue::Bool(value) => Json::Bool(value),
            FieldValue::Integer(value) => Json::from(value),
            FieldValue::UnsignedInteger(value) => Json::from(value),
            FieldValue::Float32(value) => float(f64::from(value)),
            FieldValue::Float64(value) => float(value),
            FieldValue::Binary(value) => Json::String(STANDARD.encode(value)),
            FieldValue::String(value) => Json::String(value.to_string()),
            FieldValue::Array(array) => Json::Array(array.iter().map(|e| e.to_json()).collect()),
            FieldValue::Object(object) => object_to_json(&object),
            FieldValue::Reference(hash)
            | FieldValue::BinaryReference(hash)
            | FieldValue::Hash(hash) => Json::String(hex(&hash)),
            FieldValue::Uuid(uuid) => Json::String(uuid.hyphenated().to_string()),
            FieldValue::DateTime(ticks) | FieldValue::TimeSpan(ticks) => Json::from(ticks),
        }
    }

    /// Converts the field's value to compact JSON text.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

impl Object {
    pub fn to_json(&self) -> Json {
        object_to_json(self)
    }

    /// Converts the object to compact JSON text.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

fn object_to_json(object: &Object) -> Json {
    let members: Map<String, Json> = object
        .iter()
        .map(|member| (member.name().to_string(), member.to_json()))
        .collect();
    Json::Object(members)
}

fn float(value: f64) -> Json {
    Number::from_f64(value).map_or(Json::Null, Json::Number)
}

#[cfg(test)]
mod tests {
    use crate::Writer;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_to_json() {
        let mut writer = Writer::new();
        writer.begin_object();
        writer.name("null").null();
        writer.name("flag").bool(false);
        writer.name("count").integer_i64(-3);
        writer.name("huge").integer_u64(u64::MAX);
        writer.name("half").float32(0.5);
        writer.name("nan").float64(f64::NAN);
        writer.name("blob").binary(b"hi!");
        writer.name("text").string("plain");
        writer.name("list").begin_array();
        writer.integer_u64(1).integer_u64(2);
        writer.end_array();
        writer.name("digest").hash([0xab; 32]);
        writer
            .name("id")
            .uuid(Uuid::from_u128(0x67e5_5044_10b1_426f_9247_bb68_0e5f_e0c8));
        writer.name("when").date_time_ticks(42);
        writer.end_object();
        let field = writer.save();

        assert_eq!(
            field.to_json(),
            json!({
                "null": null,
                "flag": false,
                "count": -3,
                "huge": u64::MAX,
                "half": 0.5,
                "nan": null,
                "blob": "aGkh",
                "text": "plain",
                "list": [1, 2],
                "digest": "ab".repeat(32),
                "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
                "when": 42,
            })
        );
    }

    #[test]
    fn test_to_json_string() {
        let mut writer = Writer::new();
        writer.begin_object();
        writer.name("a").begin_array();
        writer.bool(true).null();
        writer.end_array();
        writer.end_object();
        let field = writer.save();

        assert_eq!(field.to_json_string(), r#"{"a":[true,null]}"#);
        assert_eq!(
            field.as_object().unwrap().to_json_string(),
            field.to_json_string()
        );
    }
}
