use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    adapters::json_schema::schema_for,
    app::registry::ToolRegistry,
    domain::{
        registration::ReregistrationPolicy,
        schema::{SchemaValue, ToolInput, shape},
    },
    shared::error::ToolError,
};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SearchNotesArgs {
    /// Free-text query matched against note titles.
    pub query: String,
    /// Maximum number of hits to return.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Restrict the search to these tags.
    pub tags: Option<Vec<String>>,
}

fn default_limit() -> u32 {
    10
}

const NOTES: &[(&str, &[&str])] = &[
    ("Release checklist", &["ops", "release"]),
    ("Protocol revision notes", &["protocol"]),
    ("Schema adapter design", &["protocol", "design"]),
];

/// Registry with the tools served by the `tool-catalog` binary.
pub fn demo_registry(policy: ReregistrationPolicy) -> ToolRegistry {
    let mut registry = ToolRegistry::with_policy(policy);

    let echo_input = ToolInput::Shape(shape([("msg", SchemaValue::string())]));
    registry.register(
        "echo",
        "Echoes input",
        Some(&echo_input),
        |args: Value| -> Result<Value, ToolError> {
            let msg = args
                .get("msg")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::InvalidArguments("'msg' must be a string".into()))?;
            Ok(json!({ "echoed": msg }))
        },
    );

    let add_input = ToolInput::Shape(shape([(
        "values",
        SchemaValue::array(SchemaValue::number()).describe("Numbers to sum"),
    )]));
    registry.register(
        "add",
        "Sum a list of numbers and return the total.",
        Some(&add_input),
        |args: Value| -> Result<Value, ToolError> {
            let values: Vec<f64> = serde_json::from_value(args["values"].clone())?;
            Ok(json!({ "sum": values.iter().sum::<f64>(), "count": values.len() }))
        },
    );

    let greet_input = ToolInput::Shape(shape([
        (
            "name",
            SchemaValue::string().min(1).max(64).describe("Who to greet"),
        ),
        (
            "role",
            SchemaValue::enumeration(["user", "admin", "guest"]).default("user"),
        ),
        ("shout", SchemaValue::boolean().optional()),
    ]));
    registry.register(
        "greet",
        "Build a greeting for a named caller.",
        Some(&greet_input),
        |args: Value| -> Result<Value, ToolError> {
            let name = args
                .get("name")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| ToolError::InvalidArguments("'name' is required".into()))?;
            let role = args.get("role").and_then(Value::as_str).unwrap_or("user");
            let mut greeting = format!("Hello {name} ({role})");
            if args.get("shout").and_then(Value::as_bool).unwrap_or(false) {
                greeting = greeting.to_uppercase();
            }
            Ok(json!({ "greeting": greeting }))
        },
    );

    let search_input = schema_for::<SearchNotesArgs>();
    registry.register(
        "search_notes",
        "Search the bundled notes by title and tag.",
        Some(&search_input),
        |args: Value| -> Result<Value, ToolError> {
            let args: SearchNotesArgs = serde_json::from_value(args)?;
            let query = args.query.to_lowercase();
            let hits: Vec<&str> = NOTES
                .iter()
                .filter(|(title, _)| title.to_lowercase().contains(&query))
                .filter(|(_, tags)| match &args.tags {
                    Some(wanted) => wanted.iter().any(|tag| tags.contains(&tag.as_str())),
                    None => true,
                })
                .map(|(title, _)| *title)
                .take(args.limit as usize)
                .collect();
            Ok(json!({ "hits": hits }))
        },
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_tools_registered_in_order() {
        let registry = demo_registry(ReregistrationPolicy::default());
        assert_eq!(registry.names(), vec!["echo", "add", "greet", "search_notes"]);
    }

    #[test]
    fn search_notes_schema_comes_from_derive() {
        let registry = demo_registry(ReregistrationPolicy::default());
        let schema = registry.get("search_notes").unwrap().input_schema.to_value();
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["limit"]["default"], json!(10));
        assert_eq!(schema["properties"]["tags"]["type"], json!("array"));
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn search_notes_filters_by_tag() {
        let registry = demo_registry(ReregistrationPolicy::default());
        let out = registry
            .call("search_notes", json!({"query": "", "tags": ["design"]}))
            .unwrap()
            .unwrap();
        assert_eq!(out, json!({"hits": ["Schema adapter design"]}));
    }

    #[test]
    fn handler_errors_are_reported() {
        let registry = demo_registry(ReregistrationPolicy::default());
        let err = registry.call("echo", json!({})).unwrap().unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
