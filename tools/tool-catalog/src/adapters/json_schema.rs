//! Adapter from JSON Schema documents (as emitted by `schemars`) to the closed
//! [`SchemaValue`] model.
//!
//! Lets tool authors describe arguments with plain `#[derive(JsonSchema)]`
//! structs. Mapping never fails; constructs with no counterpart become
//! [`SchemaValue::Other`].

use schemars::JsonSchema;
use serde_json::{Map, Value};

use crate::domain::schema::{SchemaValue, Shape, StringCheck, ToolInput};

const MAX_REF_DEPTH: usize = 32;

/// Tool input for a `JsonSchema` type. Object schemas become a bare [`Shape`].
pub fn schema_for<T: JsonSchema>() -> ToolInput {
    let schema = schemars::schema_for!(T);
    match from_json_schema(schema.as_value()) {
        SchemaValue::Object { shape, .. } => ToolInput::Shape(shape),
        other => ToolInput::Schema(other),
    }
}

pub fn from_json_schema(root: &Value) -> SchemaValue {
    Walker { root }.convert(root, 0)
}

struct Walker<'a> {
    root: &'a Value,
}

impl<'a> Walker<'a> {
    fn convert(&self, node: &'a Value, depth: usize) -> SchemaValue {
        let Some(obj) = node.as_object() else {
            return SchemaValue::other("any");
        };

        if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            return match self.resolve(reference) {
                Some(target) if depth < MAX_REF_DEPTH => {
                    let resolved = self.convert(target, depth + 1);
                    self.decorate(resolved, obj)
                }
                _ => {
                    tracing::debug!(%reference, depth, "unresolvable schema reference");
                    SchemaValue::other("ref")
                }
            };
        }

        let base = self.convert_base(obj, depth);
        self.decorate(base, obj)
    }

    /// Applies `description` and `default`, which may sit next to any schema.
    fn decorate(&self, mut schema: SchemaValue, obj: &Map<String, Value>) -> SchemaValue {
        if let Some(text) = obj.get("description").and_then(Value::as_str) {
            schema = schema.describe(text);
        }
        if let Some(value) = obj.get("default") {
            schema = schema.default(value.clone());
        }
        schema
    }

    fn convert_base(&self, obj: &'a Map<String, Value>, depth: usize) -> SchemaValue {
        if let Some(values) = obj.get("enum").and_then(Value::as_array) {
            if let Some(strings) = all_strings(values) {
                return SchemaValue::enumeration(strings);
            }
        }
        if let Some(constant) = obj.get("const").and_then(Value::as_str) {
            return SchemaValue::enumeration([constant]);
        }
        if let Some(options) = obj
            .get("anyOf")
            .or_else(|| obj.get("oneOf"))
            .and_then(Value::as_array)
        {
            return self.convert_options(options, depth);
        }

        match obj.get("type") {
            Some(Value::String(kind)) => self.convert_typed(kind, obj, depth),
            Some(Value::Array(kinds)) => {
                let names: Vec<&str> = kinds.iter().filter_map(Value::as_str).collect();
                let nullable = names.contains(&"null");
                let concrete: Vec<&str> = names.into_iter().filter(|k| *k != "null").collect();
                let schema = match concrete.as_slice() {
                    [single] => self.convert_typed(single, obj, depth),
                    [] => SchemaValue::other("null"),
                    many => SchemaValue::union(
                        many.iter().map(|kind| self.convert_typed(kind, obj, depth)),
                    ),
                };
                if nullable { schema.optional() } else { schema }
            }
            _ if obj.contains_key("properties") => self.convert_typed("object", obj, depth),
            _ => SchemaValue::other("unknown"),
        }
    }

    fn convert_options(&self, options: &'a [Value], depth: usize) -> SchemaValue {
        let nullable = options.iter().any(is_null_schema);
        let mut rest: Vec<SchemaValue> = options
            .iter()
            .filter(|option| !is_null_schema(option))
            .map(|option| self.convert(option, depth))
            .collect();
        let schema = if rest.len() == 1 {
            rest.remove(0)
        } else {
            SchemaValue::union(rest)
        };
        if nullable { schema.optional() } else { schema }
    }

    fn convert_typed(&self, kind: &str, obj: &'a Map<String, Value>, depth: usize) -> SchemaValue {
        match kind {
            "string" => match obj.get("format").and_then(Value::as_str) {
                Some("date-time") | Some("date") => SchemaValue::date(),
                _ => {
                    let mut checks = Vec::new();
                    if let Some(min) = obj.get("minLength").and_then(Value::as_u64) {
                        checks.push(StringCheck::Min(min));
                    }
                    if let Some(max) = obj.get("maxLength").and_then(Value::as_u64) {
                        checks.push(StringCheck::Max(max));
                    }
                    SchemaValue::String {
                        checks,
                        description: None,
                    }
                }
            },
            "number" | "integer" => SchemaValue::number(),
            "boolean" => SchemaValue::boolean(),
            "array" => {
                let items = match obj.get("items") {
                    Some(items) => self.convert(items, depth),
                    None => SchemaValue::other("any"),
                };
                SchemaValue::array(items)
            }
            "object" => SchemaValue::Object {
                shape: self.convert_properties(obj, depth),
                description: None,
            },
            other => SchemaValue::other(other),
        }
    }

    fn convert_properties(&self, obj: &'a Map<String, Value>, depth: usize) -> Shape {
        let required: Vec<&str> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let Some(properties) = obj.get("properties").and_then(Value::as_object) else {
            return Shape::new();
        };
        properties
            .iter()
            .map(|(name, node)| {
                let schema = self.convert(node, depth);
                let schema = match schema {
                    SchemaValue::Optional(_) | SchemaValue::Default { .. } => schema,
                    _ if required.contains(&name.as_str()) => schema,
                    _ => schema.optional(),
                };
                (name.clone(), schema)
            })
            .collect()
    }

    fn resolve(&self, reference: &str) -> Option<&'a Value> {
        let pointer = reference.strip_prefix('#')?;
        self.root.pointer(pointer)
    }
}

fn all_strings(values: &[Value]) -> Option<Vec<&str>> {
    values.iter().map(Value::as_str).collect()
}

fn is_null_schema(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("null")
}
