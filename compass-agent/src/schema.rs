//! Output schemas for structured generation.
//!
//! A [`Schema`] is sent to the provider to constrain the reply and is then
//! checked against what actually came back. The provider's constraint is a
//! hint; the local check is what the gateway relies on.

use serde_json::{Map, Value};

/// A node of a response schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String {
        description: Option<String>,
        enum_values: Option<Vec<String>>,
    },
    Number {
        description: Option<String>,
    },
    Integer {
        description: Option<String>,
    },
    Boolean {
        description: Option<String>,
    },
    Array {
        description: Option<String>,
        items: Box<Schema>,
        min_items: Option<usize>,
    },
    Object {
        description: Option<String>,
        /// Properties in the order the model should emit them
        properties: Vec<(String, Schema)>,
        required: Vec<String>,
    },
}

/// First place a value departs from its schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {reason}")]
pub struct SchemaViolation {
    /// JSON path of the offending value, `$` for the root
    pub path: String,
    pub reason: String,
}

impl Schema {
    pub fn string() -> Self {
        Schema::String {
            description: None,
            enum_values: None,
        }
    }

    /// A string restricted to a fixed set of values.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Schema::String {
            description: None,
            enum_values: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn number() -> Self {
        Schema::Number { description: None }
    }

    pub fn integer() -> Self {
        Schema::Integer { description: None }
    }

    pub fn boolean() -> Self {
        Schema::Boolean { description: None }
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array {
            description: None,
            items: Box::new(items),
            min_items: None,
        }
    }

    /// An object with no properties yet. Add them with [`Schema::required`]
    /// and [`Schema::optional`].
    pub fn object() -> Self {
        Schema::Object {
            description: None,
            properties: Vec::new(),
            required: Vec::new(),
        }
    }

    /// Add a required property. No-op on non-object schemas.
    pub fn required(mut self, name: impl Into<String>, schema: Schema) -> Self {
        if let Schema::Object {
            properties,
            required,
            ..
        } = &mut self
        {
            let name = name.into();
            required.push(name.clone());
            properties.push((name, schema));
        }
        self
    }

    /// Add an optional property. No-op on non-object schemas.
    pub fn optional(mut self, name: impl Into<String>, schema: Schema) -> Self {
        if let Schema::Object { properties, .. } = &mut self {
            properties.push((name.into(), schema));
        }
        self
    }

    /// Require at least `n` items. No-op on non-array schemas.
    pub fn min_items(mut self, n: usize) -> Self {
        if let Schema::Array { min_items, .. } = &mut self {
            *min_items = Some(n);
        }
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match &mut self {
            Schema::String { description, .. }
            | Schema::Number { description }
            | Schema::Integer { description }
            | Schema::Boolean { description }
            | Schema::Array { description, .. }
            | Schema::Object { description, .. } => *description = text,
        }
        self
    }

    fn type_name(&self) -> &'static str {
        match self {
            Schema::String { .. } => "STRING",
            Schema::Number { .. } => "NUMBER",
            Schema::Integer { .. } => "INTEGER",
            Schema::Boolean { .. } => "BOOLEAN",
            Schema::Array { .. } => "ARRAY",
            Schema::Object { .. } => "OBJECT",
        }
    }

    fn description(&self) -> Option<&str> {
        match self {
            Schema::String { description, .. }
            | Schema::Number { description }
            | Schema::Integer { description }
            | Schema::Boolean { description }
            | Schema::Array { description, .. }
            | Schema::Object { description, .. } => description.as_deref(),
        }
    }

    /// Render in the provider's `responseSchema` format.
    pub fn to_wire(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".to_string(), Value::from(self.type_name()));
        if let Some(description) = self.description() {
            out.insert("description".to_string(), Value::from(description));
        }

        match self {
            Schema::String {
                enum_values: Some(values),
                ..
            } => {
                out.insert("enum".to_string(), Value::from(values.clone()));
            }
            Schema::Array {
                items, min_items, ..
            } => {
                out.insert("items".to_string(), items.to_wire());
                if let Some(n) = min_items {
                    out.insert("minItems".to_string(), Value::from(n.to_string()));
                }
            }
            Schema::Object {
                properties,
                required,
                ..
            } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_wire()))
                    .collect();
                out.insert("properties".to_string(), Value::Object(props));
                out.insert(
                    "propertyOrdering".to_string(),
                    Value::from(
                        properties
                            .iter()
                            .map(|(name, _)| name.clone())
                            .collect::<Vec<_>>(),
                    ),
                );
                if !required.is_empty() {
                    out.insert("required".to_string(), Value::from(required.clone()));
                }
            }
            _ => {}
        }

        Value::Object(out)
    }

    /// Check a value against this schema.
    ///
    /// Optional properties may be absent or `null`. Properties the schema
    /// does not mention are ignored.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        self.validate_at(value, "$")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), SchemaViolation> {
        let violation = |reason: String| SchemaViolation {
            path: path.to_string(),
            reason,
        };
        let wrong_type = || violation(format!("expected {}, got {}", self.type_name(), kind_of(value)));

        match self {
            Schema::String { enum_values, .. } => {
                let s = value.as_str().ok_or_else(wrong_type)?;
                if let Some(allowed) = enum_values {
                    if !allowed.iter().any(|a| a == s) {
                        return Err(violation(format!(
                            "\"{s}\" is not one of {}",
                            allowed.join(", ")
                        )));
                    }
                }
            }
            Schema::Number { .. } => {
                value.as_f64().ok_or_else(wrong_type)?;
            }
            Schema::Integer { .. } => {
                if !(value.is_i64() || value.is_u64()) {
                    return Err(wrong_type());
                }
            }
            Schema::Boolean { .. } => {
                value.as_bool().ok_or_else(wrong_type)?;
            }
            Schema::Array {
                items, min_items, ..
            } => {
                let elements = value.as_array().ok_or_else(wrong_type)?;
                if let Some(min) = min_items {
                    if elements.len() < *min {
                        return Err(violation(format!(
                            "expected at least {min} items, got {}",
                            elements.len()
                        )));
                    }
                }
                for (i, element) in elements.iter().enumerate() {
                    items.validate_at(element, &format!("{path}[{i}]"))?;
                }
            }
            Schema::Object {
                properties,
                required,
                ..
            } => {
                let fields = value.as_object().ok_or_else(wrong_type)?;
                for name in required {
                    match fields.get(name) {
                        None | Some(Value::Null) => {
                            return Err(violation(format!("missing required field \"{name}\"")));
                        }
                        Some(_) => {}
                    }
                }
                for (name, schema) in properties {
                    match fields.get(name) {
                        None | Some(Value::Null) => {}
                        Some(field) => schema.validate_at(field, &format!("{path}.{name}"))?,
                    }
                }
            }
        }
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair() -> Schema {
        Schema::object()
            .required("a", Schema::string())
            .required("b", Schema::integer())
    }

    #[test]
    fn test_missing_required_field() {
        let err = pair().validate(&json!({"a": "x"})).unwrap_err();
        assert_eq!(err.path, "$");
        assert!(err.reason.contains("\"b\""));

        // null counts as missing for required fields
        assert!(pair().validate(&json!({"a": "x", "b": null})).is_err());
        assert!(pair().validate(&json!({"a": "x", "b": 3})).is_ok());
    }

    #[test]
    fn test_optional_may_be_absent_or_null() {
        let schema = Schema::object()
            .required("title", Schema::string())
            .optional("analogy", Schema::string());
        assert!(schema.validate(&json!({"title": "t"})).is_ok());
        assert!(schema.validate(&json!({"title": "t", "analogy": null})).is_ok());
        assert!(schema.validate(&json!({"title": "t", "analogy": 4})).is_err());
    }

    #[test]
    fn test_nested_path_reported() {
        let schema = Schema::object().required(
            "milestones",
            Schema::array(Schema::object().required("id", Schema::string())),
        );
        let err = schema
            .validate(&json!({"milestones": [{"id": "m0"}, {"id": 7}]}))
            .unwrap_err();
        assert_eq!(err.path, "$.milestones[1].id");
        assert!(err.reason.contains("STRING"));
    }

    #[test]
    fn test_enum_and_min_items() {
        let level = Schema::enumeration(["Beginner", "Advanced"]);
        assert!(level.validate(&json!("Beginner")).is_ok());
        assert!(level.validate(&json!("Expert")).is_err());

        let list = Schema::array(Schema::string()).min_items(2);
        assert!(list.validate(&json!(["a"])).is_err());
        assert!(list.validate(&json!(["a", "b"])).is_ok());
    }

    #[test]
    fn test_integer_rejects_fraction() {
        assert!(Schema::integer().validate(&json!(1.5)).is_err());
        assert!(Schema::integer().validate(&json!(2)).is_ok());
        assert!(Schema::number().validate(&json!(1.5)).is_ok());
    }

    #[test]
    fn test_wire_format() {
        let schema = Schema::object()
            .describe("A pair")
            .required("a", Schema::string())
            .optional("b", Schema::array(Schema::integer()).min_items(1));
        let wire = schema.to_wire();

        assert_eq!(wire["type"], "OBJECT");
        assert_eq!(wire["description"], "A pair");
        assert_eq!(wire["properties"]["a"]["type"], "STRING");
        assert_eq!(wire["properties"]["b"]["items"]["type"], "INTEGER");
        assert_eq!(wire["properties"]["b"]["minItems"], "1");
        assert_eq!(wire["propertyOrdering"], json!(["a", "b"]));
        assert_eq!(wire["required"], json!(["a"]));
    }
}
