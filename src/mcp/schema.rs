// src/mcp/schema.rs

//! Declarative argument schemas for tools.
//!
//! Native tools build a [`ToolSchema`] with the small builder API below.
//! Tools coming from external providers arrive with a JSON Schema document
//! which [`ToolSchema::from_json_schema`] translates; callers fall back to
//! [`ToolSchema::open`] when that translation fails.

use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("arguments must be a JSON object")]
    NotAnObject,
    #[error("missing required field '{field}'")]
    MissingField { field: String },
    #[error("field '{field}' must be {expected}")]
    TypeMismatch { field: String, expected: &'static str },
    #[error("field '{field}' is out of range: {detail}")]
    OutOfRange { field: String, detail: String },
    #[error("field '{field}' must be one of: {}", allowed.join(", "))]
    InvalidEnum { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NotAnObject => None,
            Self::MissingField { field }
            | Self::TypeMismatch { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::InvalidEnum { field, .. } => Some(field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("schema is not a JSON object")]
    NotAnObject,
    #[error("schema type is '{0}', expected 'object'")]
    NotObjectShaped(String),
    #[error("'properties' must be an object")]
    BadProperties,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String {
        min_len: Option<usize>,
        max_len: Option<usize>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
        integer: bool,
    },
    Boolean,
    Enum(Vec<String>),
    Object,
    Array,
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
}

impl Field {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: None,
            required: true,
            default: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(
            name,
            FieldKind::String {
                min_len: None,
                max_len: None,
            },
        )
    }

    pub fn number(name: &str) -> Self {
        Self::new(
            name,
            FieldKind::Number {
                min: None,
                max: None,
                integer: false,
            },
        )
    }

    pub fn integer(name: &str) -> Self {
        Self::new(
            name,
            FieldKind::Number {
                min: None,
                max: None,
                integer: true,
            },
        )
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn one_of(name: &str, allowed: &[&str]) -> Self {
        Self::new(
            name,
            FieldKind::Enum(allowed.iter().map(|s| s.to_string()).collect()),
        )
    }

    pub fn any(name: &str) -> Self {
        Self::new(name, FieldKind::Any)
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// A defaulted field is never reported missing.
    pub fn default(mut self, value: Value) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    pub fn min(mut self, bound: f64) -> Self {
        if let FieldKind::Number { min, .. } = &mut self.kind {
            *min = Some(bound);
        }
        self
    }

    pub fn max(mut self, bound: f64) -> Self {
        if let FieldKind::Number { max, .. } = &mut self.kind {
            *max = Some(bound);
        }
        self
    }

    pub fn min_len(mut self, len: usize) -> Self {
        if let FieldKind::String { min_len, .. } = &mut self.kind {
            *min_len = Some(len);
        }
        self
    }

    pub fn max_len(mut self, len: usize) -> Self {
        if let FieldKind::String { max_len, .. } = &mut self.kind {
            *max_len = Some(len);
        }
        self
    }

    fn to_property(&self) -> Value {
        let mut prop = match &self.kind {
            FieldKind::String { min_len, max_len } => {
                let mut p = json!({ "type": "string" });
                if let Some(n) = min_len {
                    p["minLength"] = json!(n);
                }
                if let Some(n) = max_len {
                    p["maxLength"] = json!(n);
                }
                p
            }
            FieldKind::Number { min, max, integer } => {
                let mut p = json!({ "type": if *integer { "integer" } else { "number" } });
                if let Some(n) = min {
                    p["minimum"] = json!(n);
                }
                if let Some(n) = max {
                    p["maximum"] = json!(n);
                }
                p
            }
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
            FieldKind::Object => json!({ "type": "object" }),
            FieldKind::Array => json!({ "type": "array" }),
            FieldKind::Any => json!({}),
        };
        if let Some(d) = &self.description {
            prop["description"] = json!(d);
        }
        if let Some(d) = &self.default {
            prop["default"] = d.clone();
        }
        prop
    }

    fn check(&self, value: Value) -> Result<Value, ValidationError> {
        let field = || self.name.clone();
        match &self.kind {
            FieldKind::String { min_len, max_len } => {
                let s = value.as_str().ok_or_else(|| ValidationError::TypeMismatch {
                    field: field(),
                    expected: "a string",
                })?;
                let len = s.chars().count();
                if let Some(min) = min_len {
                    if len < *min {
                        return Err(ValidationError::OutOfRange {
                            field: field(),
                            detail: format!("length {} is below {}", len, min),
                        });
                    }
                }
                if let Some(max) = max_len {
                    if len > *max {
                        return Err(ValidationError::OutOfRange {
                            field: field(),
                            detail: format!("length {} exceeds {}", len, max),
                        });
                    }
                }
                Ok(value)
            }
            FieldKind::Number { min, max, integer } => {
                let mismatch = || ValidationError::TypeMismatch {
                    field: field(),
                    expected: if *integer { "an integer" } else { "a number" },
                };
                // Numeric strings are coerced; some clients stringify every argument.
                let coerced = if *integer {
                    integer_of(&value)
                } else {
                    number_of(&value)
                }
                .ok_or_else(mismatch)?;
                let n = coerced.as_f64().ok_or_else(mismatch)?;
                if let Some(lo) = min {
                    if n < *lo {
                        return Err(ValidationError::OutOfRange {
                            field: field(),
                            detail: format!("{} is below the minimum {}", coerced, lo),
                        });
                    }
                }
                if let Some(hi) = max {
                    if n > *hi {
                        return Err(ValidationError::OutOfRange {
                            field: field(),
                            detail: format!("{} exceeds the maximum {}", coerced, hi),
                        });
                    }
                }
                Ok(coerced)
            }
            FieldKind::Boolean => match &value {
                Value::Bool(_) => Ok(value),
                Value::String(s) if s == "true" => Ok(Value::Bool(true)),
                Value::String(s) if s == "false" => Ok(Value::Bool(false)),
                _ => Err(ValidationError::TypeMismatch {
                    field: field(),
                    expected: "a boolean",
                }),
            },
            FieldKind::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.iter().any(|a| a == s) => Ok(value),
                _ => Err(ValidationError::InvalidEnum {
                    field: field(),
                    allowed: allowed.clone(),
                }),
            },
            FieldKind::Object if !value.is_object() => Err(ValidationError::TypeMismatch {
                field: field(),
                expected: "an object",
            }),
            FieldKind::Array if !value.is_array() => Err(ValidationError::TypeMismatch {
                field: field(),
                expected: "an array",
            }),
            FieldKind::Object | FieldKind::Array | FieldKind::Any => Ok(value),
        }
    }
}

fn number_of(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

/// Integers keep their exact `i64`/`u64` value; only whole floats within
/// `i64` range are converted.
fn integer_of(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => n.as_f64().and_then(whole_float),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<u64>().map(Value::from))
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_float))
        }
        _ => None,
    }
}

fn whole_float(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(Value::from(n as i64))
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolSchema {
    /// An object with declared fields. Undeclared keys are dropped unless
    /// `keep_unknown` is set.
    Object { fields: Vec<Field>, keep_unknown: bool },
    /// Accepts any argument object unchanged.
    Open,
}

impl ToolSchema {
    pub fn object() -> Self {
        Self::Object {
            fields: Vec::new(),
            keep_unknown: false,
        }
    }

    pub fn open() -> Self {
        Self::Open
    }

    pub fn field(mut self, f: Field) -> Self {
        if let Self::Object { fields, .. } = &mut self {
            fields.push(f);
        }
        self
    }

    /// The declared fields; empty for an open schema.
    pub fn fields(&self) -> &[Field] {
        match self {
            Self::Object { fields, .. } => fields,
            Self::Open => &[],
        }
    }

    /// The JSON Schema advertised through `tools/list`.
    pub fn to_input_shape(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for f in self.fields() {
            properties.insert(f.name.clone(), f.to_property());
            if f.required {
                required.push(json!(f.name));
            }
        }
        let mut shape = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            shape["required"] = Value::Array(required);
        }
        shape
    }

    /// Validates raw arguments and applies defaults. `null` counts as `{}`.
    pub fn validate(&self, raw: &Value) -> Result<Value, ValidationError> {
        let input = match raw {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => return Err(ValidationError::NotAnObject),
        };

        let (fields, keep_unknown) = match self {
            Self::Open => return Ok(Value::Object(input)),
            Self::Object {
                fields,
                keep_unknown,
            } => (fields, *keep_unknown),
        };

        let mut out = if keep_unknown { input.clone() } else { Map::new() };
        for f in fields {
            match input.get(&f.name) {
                Some(v) if !v.is_null() => {
                    out.insert(f.name.clone(), f.check(v.clone())?);
                }
                _ => {
                    if let Some(d) = &f.default {
                        out.insert(f.name.clone(), d.clone());
                    } else if f.required {
                        return Err(ValidationError::MissingField {
                            field: f.name.clone(),
                        });
                    } else {
                        out.remove(&f.name);
                    }
                }
            }
        }
        Ok(Value::Object(out))
    }

    /// Translates a provider-supplied JSON Schema into a [`ToolSchema`].
    ///
    /// Property types this module does not model become `Any`; only a
    /// structurally unusable document is an error.
    pub fn from_json_schema(schema: &Value) -> Result<Self, SchemaError> {
        let obj = schema.as_object().ok_or(SchemaError::NotAnObject)?;
        match obj.get("type").and_then(Value::as_str) {
            Some("object") | None => {}
            Some(other) => return Err(SchemaError::NotObjectShaped(other.to_string())),
        }

        let required: Vec<&str> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let properties = match obj.get("properties") {
            None => return Ok(Self::object()),
            Some(Value::Object(p)) => p,
            Some(_) => return Err(SchemaError::BadProperties),
        };

        let mut fields = Vec::with_capacity(properties.len());
        for (name, prop) in properties {
            let mut f = Field::new(name, kind_from_property(prop));
            f.required = required.contains(&name.as_str());
            f.description = prop
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(d) = prop.get("default") {
                f.default = Some(d.clone());
                f.required = false;
            }
            fields.push(f);
        }

        let keep_unknown = obj.get("additionalProperties") != Some(&Value::Bool(false));
        Ok(Self::Object {
            fields,
            keep_unknown,
        })
    }
}

fn kind_from_property(prop: &Value) -> FieldKind {
    if let Some(values) = prop.get("enum").and_then(Value::as_array) {
        let allowed: Vec<String> = values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        if allowed.len() == values.len() && !allowed.is_empty() {
            return FieldKind::Enum(allowed);
        }
        return FieldKind::Any;
    }
    let usize_of = |key: &str| prop.get(key).and_then(Value::as_u64).map(|n| n as usize);
    let f64_of = |key: &str| prop.get(key).and_then(Value::as_f64);
    match prop.get("type").and_then(Value::as_str) {
        Some("string") => FieldKind::String {
            min_len: usize_of("minLength"),
            max_len: usize_of("maxLength"),
        },
        Some("number") => FieldKind::Number {
            min: f64_of("minimum"),
            max: f64_of("maximum"),
            integer: false,
        },
        Some("integer") => FieldKind::Number {
            min: f64_of("minimum"),
            max: f64_of("maximum"),
            integer: true,
        },
        Some("boolean") => FieldKind::Boolean,
        Some("object") => FieldKind::Object,
        Some("array") => FieldKind::Array,
        _ => FieldKind::Any,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_schema() -> ToolSchema {
        ToolSchema::object()
            .field(Field::string("query").describe("Search query"))
            .field(Field::number("count").min(1.0).max(20.0).default(json!(10)))
    }

    #[test]
    fn applies_defaults_and_drops_unknown_keys() {
        let out = search_schema()
            .validate(&json!({ "query": "somnia", "junk": 1 }))
            .unwrap();
        assert_eq!(out, json!({ "query": "somnia", "count": 10 }));
    }

    #[test]
    fn reports_the_missing_field() {
        let err = search_schema().validate(&json!({ "count": 3 })).unwrap_err();
        assert_eq!(err.field(), Some("query"));
        assert!(matches!(err, ValidationError::MissingField { .. }));
    }

    #[test]
    fn enforces_numeric_bounds() {
        let err = search_schema()
            .validate(&json!({ "query": "x", "count": 50 }))
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn coerces_numeric_strings() {
        let out = search_schema()
            .validate(&json!({ "query": "x", "count": "5" }))
            .unwrap();
        assert_eq!(out["count"], json!(5.0));
    }

    #[test]
    fn integers_keep_full_precision() {
        let schema = ToolSchema::object().field(Field::integer("nonce"));
        for exact in [json!(9_007_199_254_740_993_i64), json!(u64::MAX)] {
            let out = schema.validate(&json!({ "nonce": exact.clone() })).unwrap();
            assert_eq!(out["nonce"], exact);
        }
        let out = schema
            .validate(&json!({ "nonce": "18446744073709551615" }))
            .unwrap();
        assert_eq!(out["nonce"], json!(u64::MAX));
        assert_eq!(schema.validate(&json!({ "nonce": 7.0 })).unwrap()["nonce"], json!(7));
    }

    #[test]
    fn integers_reject_fractions_and_out_of_range_floats() {
        let schema = ToolSchema::object().field(Field::integer("nonce"));
        for bad in [json!(2.5), json!(1e300), json!("3.5"), json!("lots")] {
            let err = schema.validate(&json!({ "nonce": bad })).unwrap_err();
            assert!(matches!(err, ValidationError::TypeMismatch { .. }));
        }
    }

    #[test]
    fn booleans_accept_literal_strings_and_any_passes_through() {
        let schema = ToolSchema::object()
            .field(Field::boolean("fresh"))
            .field(Field::any("extra").optional());
        let out = schema
            .validate(&json!({ "fresh": "true", "extra": [1, { "a": null }] }))
            .unwrap();
        assert_eq!(out, json!({ "fresh": true, "extra": [1, { "a": null }] }));
        assert!(schema.validate(&json!({ "fresh": "yes" })).is_err());

        let shape = schema.to_input_shape();
        assert_eq!(shape["properties"]["fresh"]["type"], "boolean");
        assert_eq!(shape["properties"]["extra"], json!({}));
    }

    #[test]
    fn rejects_values_outside_an_enum() {
        let schema = ToolSchema::object().field(Field::one_of("network", &["MAINNET", "TESTNET"]));
        let err = schema.validate(&json!({ "network": "devnet" })).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidEnum { .. }));
    }

    #[test]
    fn input_shape_lists_required_fields() {
        let shape = search_schema().to_input_shape();
        assert_eq!(shape["type"], "object");
        assert_eq!(shape["required"], json!(["query"]));
        assert_eq!(shape["properties"]["count"]["default"], json!(10));
        assert_eq!(shape["properties"]["count"]["maximum"], json!(20.0));
    }

    #[test]
    fn open_schema_accepts_anything_and_advertises_no_fields() {
        let schema = ToolSchema::open();
        let args = json!({ "anything": [1, 2, 3] });
        assert_eq!(schema.validate(&args).unwrap(), args);
        assert_eq!(schema.to_input_shape(), json!({ "type": "object", "properties": {} }));
    }

    #[test]
    fn translates_json_schema_documents() {
        let schema = ToolSchema::from_json_schema(&json!({
            "type": "object",
            "properties": {
                "to": { "type": "string", "description": "Recipient" },
                "amount": { "type": "integer", "minimum": 0 },
                "mode": { "enum": ["fast", "slow"] }
            },
            "required": ["to"]
        }))
        .unwrap();
        let to = schema.fields().iter().find(|f| f.name == "to").unwrap();
        assert!(to.required);
        assert_eq!(to.description.as_deref(), Some("Recipient"));
        let mode = schema.fields().iter().find(|f| f.name == "mode").unwrap();
        assert_eq!(mode.kind, FieldKind::Enum(vec!["fast".into(), "slow".into()]));
        assert!(schema.validate(&json!({ "amount": 1 })).is_err());
    }

    #[test]
    fn non_object_json_schema_is_an_error() {
        assert!(ToolSchema::from_json_schema(&json!({ "type": "string" })).is_err());
        assert!(ToolSchema::from_json_schema(&json!("nope")).is_err());
        assert!(ToolSchema::from_json_schema(&json!({ "properties": [] })).is_err());
    }
}
