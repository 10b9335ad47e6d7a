//! Converts [`SchemaValue`] trees into [`StructuralDescription`]s.
//!
//! Every entry point is total: unknown or missing input degrades to a minimal
//! description instead of failing, so a tool can always be advertised.

use crate::domain::{
    description::{JsonType, Properties, StructuralDescription},
    schema::{SchemaValue, Shape, StringCheck, ToolInput},
};

/// Describes a nested schema. Unrecognized tags fall back to `{type:"string"}`.
pub fn describe(schema: &SchemaValue) -> StructuralDescription {
    match schema {
        SchemaValue::String {
            checks,
            description,
        } => {
            let mut out = StructuralDescription::of_type(JsonType::String)
                .with_description(description.as_deref());
            out.min_length = checks.iter().find_map(|check| match check {
                StringCheck::Min(len) => Some(*len),
                _ => None,
            });
            out.max_length = checks.iter().find_map(|check| match check {
                StringCheck::Max(len) => Some(*len),
                _ => None,
            });
            out
        }
        SchemaValue::Number { description } => {
            StructuralDescription::of_type(JsonType::Number).with_description(description.as_deref())
        }
        SchemaValue::Boolean { description } => StructuralDescription::of_type(JsonType::Boolean)
            .with_description(description.as_deref()),
        SchemaValue::Enum {
            values,
            description,
        } => StructuralDescription {
            enum_values: Some(values.clone()),
            ..StructuralDescription::of_type(JsonType::String)
        }
        .with_description(description.as_deref()),
        SchemaValue::Array { items, description } => StructuralDescription {
            items: Some(Box::new(describe(items))),
            ..StructuralDescription::of_type(JsonType::Array)
        }
        .with_description(description.as_deref()),
        SchemaValue::Object { shape, description } => {
            describe_shape(shape).with_description(description.as_deref())
        }
        SchemaValue::Union {
            options,
            description,
        } => StructuralDescription {
            one_of: Some(options.iter().map(describe).collect()),
            ..StructuralDescription::default()
        }
        .with_description(description.as_deref()),
        SchemaValue::Date { description } => StructuralDescription {
            format: Some("date-time".into()),
            ..StructuralDescription::of_type(JsonType::String)
        }
        .with_description(description.as_deref()),
        SchemaValue::Default { inner, value } => StructuralDescription {
            default: Some(value.clone()),
            ..describe(inner)
        },
        // Optionality is recorded by the parent object, not the child.
        SchemaValue::Optional(inner) => describe(inner),
        SchemaValue::Other { tag } => {
            tracing::debug!(%tag, "unrecognized schema tag; advertising string");
            StructuralDescription::of_type(JsonType::String)
        }
    }
}

/// Describes a bare `name -> schema` mapping as an object.
pub fn describe_shape(shape: &Shape) -> StructuralDescription {
    let mut properties = Properties::new();
    let mut required: Vec<String> = Vec::new();
    for (name, schema) in shape {
        properties.insert(name.clone(), describe(schema));
        if !is_optional(schema) && !required.contains(name) {
            required.push(name.clone());
        }
    }
    StructuralDescription::object(properties, required)
}

/// Top-level entry used by tool registration. Missing input, or input without a
/// recognizable tag, is advertised as a bare object.
pub fn describe_tool_input(input: Option<&ToolInput>) -> StructuralDescription {
    match input {
        Some(ToolInput::Shape(shape)) => describe_shape(shape),
        Some(ToolInput::Schema(SchemaValue::Other { tag })) => {
            tracing::debug!(%tag, "unrecognized top-level schema; advertising object");
            StructuralDescription::of_type(JsonType::Object)
        }
        Some(ToolInput::Schema(schema)) => describe(schema),
        None => StructuralDescription::of_type(JsonType::Object),
    }
}

/// Fields wrapped as optional or carrying a default are not required.
pub fn is_optional(schema: &SchemaValue) -> bool {
    matches!(
        schema,
        SchemaValue::Optional(_) | SchemaValue::Default { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_length_check_of_each_kind_wins() {
        let schema = SchemaValue::string().min(2).max(8).min(5).max(20);
        let out = describe(&schema);
        assert_eq!(out.min_length, Some(2));
        assert_eq!(out.max_length, Some(8));
    }

    #[test]
    fn default_overrides_inner_default() {
        let schema = SchemaValue::string().default("inner").default("outer");
        assert_eq!(describe(&schema).default, Some(json!("outer")));
    }

    #[test]
    fn optional_inside_default_collapses() {
        let schema = SchemaValue::number().optional().default(3);
        assert_eq!(
            describe(&schema).to_value(),
            json!({"type": "number", "default": 3})
        );
    }

    #[test]
    fn default_inside_optional_collapses() {
        let schema = SchemaValue::boolean().default(false).optional();
        assert_eq!(
            describe(&schema).to_value(),
            json!({"type": "boolean", "default": false})
        );
    }

    #[test]
    fn unknown_tag_nested_is_string_but_top_level_is_object() {
        let unknown = SchemaValue::other("bigint");
        assert_eq!(describe(&unknown).to_value(), json!({"type": "string"}));
        assert_eq!(
            describe_tool_input(Some(&ToolInput::Schema(unknown))).to_value(),
            json!({"type": "object"})
        );
        assert_eq!(describe_tool_input(None).to_value(), json!({"type": "object"}));
    }

    #[test]
    fn duplicate_shape_names_keep_single_entry() {
        let shape = vec![
            ("a".to_string(), SchemaValue::string()),
            ("a".to_string(), SchemaValue::number()),
        ];
        assert_eq!(
            describe_shape(&shape).to_value(),
            json!({
                "type": "object",
                "properties": {"a": {"type": "number"}},
                "required": ["a"],
                "additionalProperties": false
            })
        );
    }
}
