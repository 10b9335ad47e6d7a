//! Closed model of the validation schemas a tool author hands to the catalog.
//!
//! External validation libraries are mapped onto [`SchemaValue`] by an adapter
//! (see `adapters::json_schema`); the introspector only ever sees this enum.

use serde_json::Value;

/// Ordered `name -> schema` mapping, declaration order preserved.
pub type Shape = Vec<(String, SchemaValue)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringCheck {
    Min(u64),
    Max(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaValue {
    String {
        checks: Vec<StringCheck>,
        description: Option<String>,
    },
    Number {
        description: Option<String>,
    },
    Boolean {
        description: Option<String>,
    },
    Enum {
        values: Vec<String>,
        description: Option<String>,
    },
    Array {
        items: Box<SchemaValue>,
        description: Option<String>,
    },
    Object {
        shape: Shape,
        description: Option<String>,
    },
    Date {
        description: Option<String>,
    },
    Optional(Box<SchemaValue>),
    Default {
        inner: Box<SchemaValue>,
        value: Value,
    },
    Union {
        options: Vec<SchemaValue>,
        description: Option<String>,
    },
    /// A tag the adapter could not map.
    Other {
        tag: String,
    },
}

impl SchemaValue {
    pub fn string() -> Self {
        Self::String {
            checks: Vec::new(),
            description: None,
        }
    }

    pub fn number() -> Self {
        Self::Number { description: None }
    }

    pub fn boolean() -> Self {
        Self::Boolean { description: None }
    }

    pub fn date() -> Self {
        Self::Date { description: None }
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            values: values.into_iter().map(Into::into).collect(),
            description: None,
        }
    }

    pub fn array(items: SchemaValue) -> Self {
        Self::Array {
            items: Box::new(items),
            description: None,
        }
    }

    pub fn object<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, SchemaValue)>,
        S: Into<String>,
    {
        Self::Object {
            shape: shape(fields),
            description: None,
        }
    }

    pub fn union<I>(options: I) -> Self
    where
        I: IntoIterator<Item = SchemaValue>,
    {
        Self::Union {
            options: options.into_iter().collect(),
            description: None,
        }
    }

    pub fn other(tag: impl Into<String>) -> Self {
        Self::Other { tag: tag.into() }
    }

    /// Adds a minimum-length check. Only meaningful on strings; other tags are
    /// returned unchanged.
    pub fn min(self, len: u64) -> Self {
        self.with_check(StringCheck::Min(len))
    }

    /// Adds a maximum-length check. Only meaningful on strings.
    pub fn max(self, len: u64) -> Self {
        self.with_check(StringCheck::Max(len))
    }

    fn with_check(self, check: StringCheck) -> Self {
        match self {
            Self::String {
                mut checks,
                description,
            } => {
                checks.push(check);
                Self::String {
                    checks,
                    description,
                }
            }
            Self::Optional(inner) => Self::Optional(Box::new((*inner).with_check(check))),
            Self::Default { inner, value } => Self::Default {
                inner: Box::new((*inner).with_check(check)),
                value,
            },
            other => other,
        }
    }

    /// Attaches human-readable text. Wrappers forward it to the wrapped schema.
    pub fn describe(self, text: impl Into<String>) -> Self {
        let text = text.into();
        match self {
            Self::String { checks, .. } => Self::String {
                checks,
                description: Some(text),
            },
            Self::Number { .. } => Self::Number { description: Some(text) },
            Self::Boolean { .. } => Self::Boolean { description: Some(text) },
            Self::Enum { values, .. } => Self::Enum {
                values,
                description: Some(text),
            },
            Self::Array { items, .. } => Self::Array {
                items,
                description: Some(text),
            },
            Self::Object { shape, .. } => Self::Object {
                shape,
                description: Some(text),
            },
            Self::Date { .. } => Self::Date { description: Some(text) },
            Self::Union { options, .. } => Self::Union {
                options,
                description: Some(text),
            },
            Self::Optional(inner) => Self::Optional(Box::new((*inner).describe(text))),
            Self::Default { inner, value } => Self::Default {
                inner: Box::new((*inner).describe(text)),
                value,
            },
            other @ Self::Other { .. } => other,
        }
    }

    pub fn optional(self) -> Self {
        Self::Optional(Box::new(self))
    }

    pub fn default(self, value: impl Into<Value>) -> Self {
        Self::Default {
            inner: Box::new(self),
            value: value.into(),
        }
    }

    /// Discriminator name, used in logs.
    pub fn tag(&self) -> &str {
        match self {
            Self::String { .. } => "string",
            Self::Number { .. } => "number",
            Self::Boolean { .. } => "boolean",
            Self::Enum { .. } => "enum",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
            Self::Date { .. } => "date",
            Self::Optional(_) => "optional",
            Self::Default { .. } => "default",
            Self::Union { .. } => "union",
            Self::Other { tag } => tag,
        }
    }
}

/// Builds a [`Shape`] from `(name, schema)` pairs.
pub fn shape<I, S>(fields: I) -> Shape
where
    I: IntoIterator<Item = (S, SchemaValue)>,
    S: Into<String>,
{
    fields
        .into_iter()
        .map(|(name, schema)| (name.into(), schema))
        .collect()
}

/// What the registration call path supplies as a tool's input contract.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    Schema(SchemaValue),
    /// A bare mapping of named schemas, treated as an object's properties.
    Shape(Shape),
}

impl From<SchemaValue> for ToolInput {
    fn from(schema: SchemaValue) -> Self {
        Self::Schema(schema)
    }
}

impl From<Shape> for ToolInput {
    fn from(shape: Shape) -> Self {
        Self::Shape(shape)
    }
}
