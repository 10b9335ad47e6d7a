//! Builds `tools/list` payloads.
//!
//! Each listing carries the legacy fields (`description`, `inputSchema`) and the
//! modern `annotations` object at the same time, whichever revision the
//! connection negotiated. Peers on either revision read the fields they know.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    app::registry::ToolEntry,
    domain::{description::StructuralDescription, revision::ProtocolRevision},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListing {
    pub name: String,
    pub description: String,
    pub input_schema: StructuralDescription,
    /// `description` followed by every top-level key of `input_schema`; schema
    /// keys win on collision.
    pub annotations: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolListing>,
}

pub fn build<'a, I>(entries: I, revision: ProtocolRevision) -> ToolListResponse
where
    I: IntoIterator<Item = &'a ToolEntry>,
{
    let tools: Vec<ToolListing> = entries.into_iter().map(listing).collect();
    tracing::debug!(
        revision = revision.as_str(),
        count = tools.len(),
        "tool list built"
    );
    ToolListResponse { tools }
}

fn listing(entry: &ToolEntry) -> ToolListing {
    let mut annotations = Map::new();
    annotations.insert(
        "description".into(),
        Value::String(entry.description.clone()),
    );
    for (key, value) in entry.input_schema.to_object() {
        annotations.insert(key, value);
    }
    ToolListing {
        name: entry.name.clone(),
        description: entry.description.clone(),
        input_schema: entry.input_schema.clone(),
        annotations,
    }
}
