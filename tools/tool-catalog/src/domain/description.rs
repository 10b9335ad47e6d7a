//! JSON-Schema-like structural descriptions advertised for every tool.

use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// Ordered property mapping. Inserting an existing name replaces it in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties(Vec<(String, StructuralDescription)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, description: StructuralDescription) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = description,
            None => self.0.push((name, description)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&StructuralDescription> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, description)| description)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StructuralDescription)> {
        self.0.iter().map(|(name, description)| (name.as_str(), description))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, description) in self.iter() {
            map.serialize_entry(name, description)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralDescription {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<JsonType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<StructuralDescription>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<StructuralDescription>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl StructuralDescription {
    pub fn of_type(kind: JsonType) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Object description. Undeclared fields are always rejected and an empty
    /// `required` list is omitted.
    pub fn object(properties: Properties, required: Vec<String>) -> Self {
        Self {
            kind: Some(JsonType::Object),
            properties: Some(properties),
            required: (!required.is_empty()).then_some(required),
            additional_properties: Some(false),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: Option<&str>) -> Self {
        if let Some(text) = description {
            self.description = Some(text.to_owned());
        }
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|err| {
            tracing::error!(%err, "failed to serialize structural description");
            Value::Object(Map::new())
        })
    }

    /// Top-level keys as a JSON object, in serialization order.
    pub fn to_object(&self) -> Map<String, Value> {
        match self.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_omits_required() {
        let description = StructuralDescription::object(Properties::new(), vec![]);
        assert_eq!(
            description.to_value(),
            json!({"type": "object", "properties": {}, "additionalProperties": false})
        );
    }

    #[test]
    fn properties_serialize_in_insertion_order() {
        let mut properties = Properties::new();
        properties.insert("zeta", StructuralDescription::of_type(JsonType::String));
        properties.insert("alpha", StructuralDescription::of_type(JsonType::Number));
        properties.insert("zeta", StructuralDescription::of_type(JsonType::Boolean));
        let rendered = serde_json::to_string(&properties).unwrap();
        assert_eq!(rendered, r#"{"zeta":{"type":"boolean"},"alpha":{"type":"number"}}"#);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut properties = Properties::new();
        assert!(properties.is_empty());
        properties.insert("zeta", StructuralDescription::of_type(JsonType::String));
        properties.insert("alpha", StructuralDescription::of_type(JsonType::Number));
        properties.insert("zeta", StructuralDescription::of_type(JsonType::Boolean));
        assert_eq!(properties.len(), 2);
        assert_eq!(properties.names().collect::<Vec<_>>(), ["zeta", "alpha"]);
        assert_eq!(
            properties.get("zeta").and_then(|p| p.kind),
            Some(JsonType::Boolean)
        );
        assert!(properties.get("missing").is_none());
    }

    #[test]
    fn null_default_is_still_emitted() {
        let description = StructuralDescription {
            default: Some(Value::Null),
            ..StructuralDescription::of_type(JsonType::String)
        };
        assert_eq!(description.to_value(), json!({"type": "string", "default": null}));
    }
}
