use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Output types the client can force through its `structured_response`
/// tool. Blanket-implemented for anything that is both a JsonSchema
/// and deserializable.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Schema in the shape the Messages API tool contract accepts:
    /// every object closed (`additionalProperties: false`) with all of
    /// its properties required, and no `$ref` indirection left.
    fn tool_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = match &value {
            Value::Object(map) => map.get("definitions").cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        };
        normalize(&mut value, &definitions);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }
        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// One walk over the schemars output. Handles the three shapes
/// schemars 0.8 produces for derived structs: `#/definitions/*` refs
/// for named nested types, single-entry `allOf` wrappers around those
/// refs, and plain `type: object` nodes.
fn normalize(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(path)) = map.get("$ref").cloned() {
                if let Some(name) = path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(name) {
                        *value = def.clone();
                        normalize(value, definitions);
                        return;
                    }
                }
            }

            if let Some(Value::Array(all_of)) = map.get("allOf").cloned() {
                if all_of.len() == 1 {
                    *value = all_of.into_iter().next().unwrap_or(Value::Null);
                    normalize(value, definitions);
                    return;
                }
            }

            if map.get("type") == Some(&Value::String("object".to_string())) {
                let keys: Option<Vec<Value>> = match map.get("properties") {
                    Some(Value::Object(props)) => {
                        Some(props.keys().cloned().map(Value::String).collect())
                    }
                    _ => None,
                };
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(keys) = keys {
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }

            for v in map.values_mut() {
                normalize(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Listing {
        address: Option<String>,
        rooms: Option<f64>,
        title: String,
    }

    #[test]
    fn all_properties_required_even_nullable() {
        let schema = Listing::tool_schema();
        let required = schema
            .get("required")
            .expect("should have required array")
            .as_array()
            .unwrap();
        let names: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();

        assert!(names.contains(&"address"));
        assert!(names.contains(&"rooms"));
        assert!(names.contains(&"title"));
    }

    #[test]
    fn nested_structs_are_inlined() {
        #[derive(Deserialize, JsonSchema)]
        struct Inner {
            note: Option<String>,
        }

        #[derive(Deserialize, JsonSchema)]
        struct Outer {
            inner: Inner,
        }

        let schema = Outer::tool_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("definitions"));
        assert!(!obj.contains_key("$schema"));

        let inner = obj["properties"]["inner"].as_object().unwrap();
        assert!(!inner.contains_key("$ref"));
        assert_eq!(inner.get("additionalProperties"), Some(&Value::Bool(false)));
    }

    #[test]
    fn optional_nested_structs_lose_their_allof_wrapper() {
        #[derive(Deserialize, JsonSchema)]
        struct Inner {
            note: String,
        }

        #[derive(Deserialize, JsonSchema)]
        struct Outer {
            inner: Option<Inner>,
        }

        let schema = Outer::tool_schema();
        let rendered = serde_json::to_string(&schema).unwrap();
        assert!(!rendered.contains("$ref"));
        assert!(!rendered.contains("allOf"));

        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 1);
        assert_eq!(required[0], "inner");
    }
}
