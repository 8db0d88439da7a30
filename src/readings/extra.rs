use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Native representation of one `extra` entry.
///
/// Serialized untagged, so a stored or published value looks exactly like the
/// JSON it came from. Variant order matters for deserialization: integers are
/// tried before floats, so `5` reads back as `Integer` and `5.0` as `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ExtraValue>),
    Map(BTreeMap<String, ExtraValue>),
}

/// Converts a parsed-JSON value into a native value. Never fails.
///
/// | JSON                     | Result            |
/// |--------------------------|-------------------|
/// | string                   | `String`          |
/// | number fitting `i64`     | `Integer`         |
/// | any other number         | `Float`           |
/// | `true` / `false`         | `Bool`            |
/// | array                    | `List` (recursed) |
/// | object                   | `Map` (recursed)  |
/// | `null`                   | `String("")`      |
impl From<Value> for ExtraValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::String(s),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Integer(i),
                (None, Some(f)) => Self::Float(f),
                // Only reachable with arbitrary-precision numbers.
                (None, None) => Self::String(n.to_string()),
            },
            Value::Bool(b) => Self::Bool(b),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(convert_map(map)),
            Value::Null => Self::String(String::new()),
        }
    }
}

/// Converts a whole wire-format `extra` object.
pub fn convert_map(map: serde_json::Map<String, Value>) -> BTreeMap<String, ExtraValue> {
    map.into_iter()
        .map(|(key, value)| (key, ExtraValue::from(value)))
        .collect()
}
