//! Strict JSON schema generation for OpenAI structured outputs.
//!
//! Schemas come from `schemars` and are rewritten into the subset that
//! `response_format: json_schema` accepts with `strict: true`.
//!
//! ```rust,ignore
//! #[derive(Deserialize, JsonSchema)]
//! struct Verdict {
//!     decision: String,
//!     confidence: f64,
//! }
//!
//! let schema = Verdict::openai_schema();
//! ```

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types that can be requested as a strict structured output.
///
/// Blanket-implemented for every `JsonSchema + DeserializeOwned` type.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Schema with every `$ref` inlined, `additionalProperties: false` on each
    /// object, every property listed in `required`, and no `format` hints.
    fn openai_schema() -> Value {
        let mut root = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = match &mut root {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions").unwrap_or(Value::Null)
            }
            _ => Value::Null,
        };

        strictify(&mut root, &definitions);
        root
    }

    /// Name sent alongside the schema in the request.
    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn strictify(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(target) = resolve_ref(map, definitions) {
                *value = target;
                strictify(value, definitions);
                return;
            }

            if map.get("type").is_some_and(Value::is_string) {
                map.remove("format");
            }
            if map.get("type").and_then(Value::as_str) == Some("object") {
                close_object(map);
            }

            for child in map.values_mut() {
                strictify(child, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                strictify(item, definitions);
            }
        }
        _ => {}
    }
}

/// Returns the definition a `#/definitions/Name` reference points at.
fn resolve_ref(map: &Map<String, Value>, definitions: &Value) -> Option<Value> {
    let name = map
        .get("$ref")
        .and_then(Value::as_str)?
        .strip_prefix("#/definitions/")?;
    definitions.get(name).cloned()
}

fn close_object(map: &mut Map<String, Value>) {
    map.insert("additionalProperties".into(), Value::Bool(false));

    let required: Option<Vec<Value>> = map
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().map(Value::String).collect());

    if let Some(required) = required {
        map.insert("required".into(), Value::Array(required));
    }
}
