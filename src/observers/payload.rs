use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A request document whose leaves are either plain JSON or values with no
/// JSON representation of their own.
///
/// Non-JSON leaves serialize to their string form, so turning a `Payload`
/// into JSON text never fails part way through the document. Binary data
/// becomes standard base64, which is also how Bedrock's JSON protocol
/// carries blobs.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Object(Vec<(String, Payload)>),
    Array(Vec<Payload>),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn object() -> Self {
        Payload::Object(Vec::new())
    }

    /// Appends a field. Only meaningful on `Object`; other variants are
    /// returned unchanged.
    pub fn with(mut self, key: &str, value: impl Into<Payload>) -> Self {
        if let Payload::Object(entries) = &mut self {
            entries.push((key.to_string(), value.into()));
        }
        self
    }

    /// Pretty JSON with two-space indentation.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(items: Vec<Payload>) -> Self {
        Payload::Array(items)
    }
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Payload::Json(value) => value.serialize(serializer),
            Payload::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Payload::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Payload::Bytes(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bytes_render_as_base64_strings() {
        let payload = Payload::object()
            .with("format", json!("png"))
            .with("bytes", Payload::Bytes(vec![0xff, 0x00, 0x10]));
        let value: Value = serde_json::from_str(&payload.to_json_string().unwrap()).unwrap();
        assert_eq!(value, json!({ "format": "png", "bytes": "/wAQ" }));
    }

    #[test]
    fn object_keeps_insertion_order() {
        let payload = Payload::object().with("z", json!(1)).with("a", json!(2));
        assert_eq!(payload.to_json_string().unwrap(), r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn pretty_output_uses_two_space_indent() {
        let payload = Payload::object().with("a", json!(1));
        assert_eq!(payload.to_pretty_json().unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn with_ignores_non_objects() {
        let payload = Payload::Json(json!([1])).with("a", json!(2));
        assert_eq!(payload, Payload::Json(json!([1])));
    }
}
