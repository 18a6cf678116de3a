//! Attribute schemas for the provider, its resources and data sources.
//!
//! A [`ResourceSchema`] maps attribute names to [`Schema`] descriptions.
//! Schemas are declared with a small builder:
//!
//! ```ignore
//! let mut schema = ResourceSchema::new();
//! schema.insert("name", Schema::string().required().force_new());
//! schema.insert("tags", Schema::set(Elem::Primitive(AttributeType::String)).optional());
//! ```

use crate::error::{ProviderError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Ordered attribute map of a resource, data source or nested block.
pub type ResourceSchema = BTreeMap<&'static str, Schema>;

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// UTF-8 string.
    String,
    /// Signed integer.
    Int,
    /// Boolean.
    Bool,
    /// Ordered list.
    List,
    /// Unordered set; element order carries no meaning.
    Set,
    /// String-keyed map.
    Map,
    /// Any JSON value.
    Dynamic,
}

impl AttributeType {
    /// Value an unset attribute of this type reads as.
    #[must_use]
    pub fn zero_value(self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Int => Value::from(0),
            Self::Bool => Value::Bool(false),
            Self::List | Self::Set => Value::Array(Vec::new()),
            Self::Map => Value::Object(Map::new()),
            Self::Dynamic => Value::Null,
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_boolean(),
            Self::List | Self::Set => value.is_array(),
            Self::Map => value.is_object(),
            Self::Dynamic => true,
        }
    }
}

/// Element description of a collection attribute.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Elem {
    /// Elements are plain values.
    Primitive(AttributeType),
    /// Elements are nested blocks.
    Block(ResourceSchema),
}

/// Description of a single attribute.
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    /// Value type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Must be set in configuration.
    pub required: bool,
    /// May be set in configuration.
    pub optional: bool,
    /// Filled in by the provider.
    pub computed: bool,
    /// A change forces replacement.
    pub force_new: bool,
    /// Environment variables consulted, in order, when the attribute is unset.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env_default: Vec<&'static str>,
    /// Static default used when neither configuration nor environment set it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Element description for collections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elem: Option<Elem>,
    /// Upper bound on collection length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl Schema {
    /// A bare attribute of the given type.
    #[must_use]
    pub fn new(attr_type: AttributeType) -> Self {
        Self {
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            env_default: Vec::new(),
            default: None,
            elem: None,
            max_items: None,
        }
    }

    /// String attribute.
    #[must_use]
    pub fn string() -> Self {
        Self::new(AttributeType::String)
    }

    /// Integer attribute.
    #[must_use]
    pub fn int() -> Self {
        Self::new(AttributeType::Int)
    }

    /// Boolean attribute.
    #[must_use]
    pub fn bool() -> Self {
        Self::new(AttributeType::Bool)
    }

    /// String-keyed map attribute.
    #[must_use]
    pub fn map() -> Self {
        Self::new(AttributeType::Map)
    }

    /// Attribute accepting any JSON value.
    #[must_use]
    pub fn dynamic() -> Self {
        Self::new(AttributeType::Dynamic)
    }

    /// List attribute.
    #[must_use]
    pub fn list(elem: Elem) -> Self {
        Self {
            elem: Some(elem),
            ..Self::new(AttributeType::List)
        }
    }

    /// Set attribute.
    #[must_use]
    pub fn set(elem: Elem) -> Self {
        Self {
            elem: Some(elem),
            ..Self::new(AttributeType::Set)
        }
    }

    /// Mark as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark as computed.
    #[must_use]
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Mark as forcing replacement.
    #[must_use]
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Fall back to the first non-empty of `vars`.
    #[must_use]
    pub fn env_default(mut self, vars: &[&'static str]) -> Self {
        self.env_default = vars.to_vec();
        self
    }

    /// Static default.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Cap the number of collection elements.
    #[must_use]
    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Default for an unset attribute: the first non-empty environment
    /// variable, else the static default.
    pub fn resolve_default<F>(&self, lookup: F) -> Option<Value>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.env_default
            .iter()
            .filter_map(|var| lookup(var))
            .find(|value| !value.is_empty())
            .map(Value::String)
            .or_else(|| self.default.clone())
    }
}

/// Connection settings every resource and data source may override.
#[must_use]
pub fn connection_attributes() -> ResourceSchema {
    let mut schema = ResourceSchema::new();
    schema.insert("host", Schema::string().optional().force_new());
    schema.insert("scheme", Schema::string().optional().force_new());
    schema.insert("http_auth", Schema::string().optional());
    schema.insert("ca_file", Schema::string().optional());
    schema.insert("cert_file", Schema::string().optional());
    schema.insert("key_file", Schema::string().optional());
    schema.insert("token", Schema::string().optional());
    schema.insert(
        "datacenter",
        Schema::string().optional().computed().force_new(),
    );
    schema
}

/// Fill unset attributes from environment and static defaults, recursing
/// into nested blocks.
pub fn apply_defaults<F>(schema: &ResourceSchema, values: &mut Map<String, Value>, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    for (name, attr) in schema {
        let unset = values.get(*name).map_or(true, Value::is_null);
        if unset {
            if let Some(default) = attr.resolve_default(lookup) {
                values.insert((*name).to_string(), default);
            }
        }

        if let (Some(Elem::Block(block)), Some(Value::Array(items))) =
            (&attr.elem, values.get_mut(*name))
        {
            for item in items.iter_mut() {
                if let Value::Object(nested) = item {
                    apply_defaults(block, nested, lookup);
                }
            }
        }
    }
}

/// Check `values` against `schema`: required attributes present, types
/// matching, collection sizes within bounds. Unknown attributes are
/// rejected so typos surface instead of being silently ignored.
///
/// # Errors
///
/// Returns [`ProviderError::Schema`] describing the first violation.
pub fn validate(schema: &ResourceSchema, values: &Map<String, Value>) -> Result<()> {
    validate_at("", schema, values)
}

fn validate_at(prefix: &str, schema: &ResourceSchema, values: &Map<String, Value>) -> Result<()> {
    for name in values.keys() {
        if name != "id" && !schema.contains_key(name.as_str()) {
            return Err(ProviderError::Schema(format!(
                "unsupported attribute '{prefix}{name}'"
            )));
        }
    }

    for (name, attr) in schema {
        let path = format!("{prefix}{name}");
        match values.get(*name).filter(|v| !v.is_null()) {
            None if attr.required => {
                return Err(ProviderError::Schema(format!(
                    "missing required attribute '{path}'"
                )));
            }
            None => {}
            Some(value) => {
                if !attr.attr_type.accepts(value) {
                    return Err(ProviderError::Schema(format!(
                        "attribute '{path}' must be of type {:?}",
                        attr.attr_type
                    )));
                }
                validate_collection(&path, attr, value)?;
            }
        }
    }
    Ok(())
}

fn validate_collection(path: &str, attr: &Schema, value: &Value) -> Result<()> {
    let Value::Array(items) = value else {
        return Ok(());
    };

    if let Some(max) = attr.max_items {
        if items.len() > max {
            return Err(ProviderError::Schema(format!(
                "attribute '{path}' accepts at most {max} item(s)"
            )));
        }
    }

    match &attr.elem {
        Some(Elem::Primitive(elem_type)) => {
            if let Some(bad) = items.iter().find(|item| !elem_type.accepts(item)) {
                return Err(ProviderError::Schema(format!(
                    "element {bad} of '{path}' must be of type {elem_type:?}"
                )));
            }
        }
        Some(Elem::Block(block)) => {
            for (index, item) in items.iter().enumerate() {
                let Value::Object(nested) = item else {
                    return Err(ProviderError::Schema(format!(
                        "element {index} of '{path}' must be a block"
                    )));
                };
                validate_at(&format!("{path}.{index}."), block, nested)?;
            }
        }
        None => {}
    }
    Ok(())
}
