use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    app::introspector,
    domain::{
        description::StructuralDescription, registration::ReregistrationPolicy, schema::ToolInput,
    },
    shared::error::ToolError,
};

pub trait ToolHandler: Send + Sync {
    fn call(&self, arguments: Value) -> Result<Value, ToolError>;
}

impl<F> ToolHandler for F
where
    F: Fn(Value) -> Result<Value, ToolError> + Send + Sync,
{
    fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        self(arguments)
    }
}

#[derive(Clone)]
pub struct ToolEntry {
    pub name: String,
    pub description: String,
    pub input_schema: StructuralDescription,
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolEntry")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Name-keyed tool store, listed in registration order.
///
/// Populated during startup and shared read-only afterwards; it never drops an
/// entry on its own.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    index: HashMap<String, usize>,
    policy: ReregistrationPolicy,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ReregistrationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> ReregistrationPolicy {
        self.policy
    }

    /// Describes `input` and stores the tool. Re-registering a name replaces the
    /// whole entry; its position follows the configured policy.
    pub fn register<H>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input: Option<&ToolInput>,
        handler: H,
    ) where
        H: ToolHandler + 'static,
    {
        let entry = ToolEntry {
            name: name.into(),
            description: description.into(),
            input_schema: introspector::describe_tool_input(input),
            handler: Arc::new(handler),
        };
        self.insert(entry);
    }

    pub fn insert(&mut self, entry: ToolEntry) {
        let Some(&slot) = self.index.get(&entry.name) else {
            tracing::debug!(tool = %entry.name, "tool registered");
            self.index.insert(entry.name.clone(), self.entries.len());
            self.entries.push(entry);
            return;
        };
        tracing::debug!(tool = %entry.name, policy = ?self.policy, "tool re-registered");
        match self.policy {
            ReregistrationPolicy::KeepPosition => self.entries[slot] = entry,
            ReregistrationPolicy::MoveToEnd => {
                self.entries.remove(slot);
                self.entries.push(entry);
                self.reindex();
            }
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (entry.name.clone(), pos))
            .collect();
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.index.get(name).map(|&pos| &self.entries[pos])
    }

    pub fn get_all(&self) -> &[ToolEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs a tool's handler. `None` when no tool of that name exists.
    pub fn call(&self, name: &str, arguments: Value) -> Option<Result<Value, ToolError>> {
        self.get(name).map(|entry| entry.handler.call(arguments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::SchemaValue;
    use serde_json::json;

    fn noop(_: Value) -> Result<Value, ToolError> {
        Ok(Value::Null)
    }

    #[test]
    fn lookup_follows_reindexing() {
        let mut registry = ToolRegistry::with_policy(ReregistrationPolicy::MoveToEnd);
        for name in ["a", "b", "c"] {
            registry.register(name, name, None, noop);
        }
        registry.register("a", "again", None, noop);
        assert_eq!(registry.names(), vec!["b", "c", "a"]);
        assert_eq!(registry.get("a").map(|e| e.description.as_str()), Some("again"));
        assert_eq!(registry.get("b").map(|e| e.description.as_str()), Some("b"));
    }

    #[test]
    fn call_dispatches_to_handler() {
        let mut registry = ToolRegistry::new();
        let input = ToolInput::Shape(vec![("msg".into(), SchemaValue::string())]);
        registry.register(
            "echo",
            "Echoes input",
            Some(&input),
            |args: Value| -> Result<Value, ToolError> { Ok(json!({ "echoed": args["msg"] })) },
        );
        let out = registry
            .call("echo", json!({"msg": "hi"}))
            .expect("registered")
            .expect("handler ok");
        assert_eq!(out, json!({"echoed": "hi"}));
        assert!(registry.call("missing", Value::Null).is_none());
    }
}
