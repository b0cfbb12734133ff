use std::fmt;

use serde_json::{Map, Number, Value};

/// A document field value.
///
/// Documents are opaque JSON objects; for indexing purposes each top-level
/// field is viewed through this closed set of variants. Only scalars
/// (`Null`, `Bool`, `Number`, `String`) produce index entries.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl FieldValue {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_)
        )
    }

    /// Short name of the JSON type, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// The token under which this value is indexed, or `None` for
    /// arrays and objects.
    ///
    /// Tokens carry a type tag so that the string `"1"`, the number `1` and
    /// the boolean `true` never share an index range. Numbers are
    /// canonicalized: `1`, `1.0` and `1e0` all produce `n:1`.
    pub fn index_token(&self) -> Option<IndexToken> {
        let token = match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => format!("b:{b}"),
            Self::Number(n) => format!("n:{}", canonical_number(n)),
            Self::String(s) => format!("s:{s}"),
            Self::Array(_) | Self::Object(_) => return None,
        };
        Some(IndexToken(token))
    }
}

/// Index token of a raw JSON value without copying arrays or objects.
pub fn index_token_of(value: &Value) -> Option<IndexToken> {
    match value {
        Value::Array(_) | Value::Object(_) => None,
        scalar => FieldValue::from(scalar.clone()).index_token(),
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(a) => Self::Array(a),
            Value::Object(o) => Self::Object(o),
        }
    }
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        Self::from(value.clone())
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Number(n) => Value::Number(n),
            FieldValue::String(s) => Value::String(s),
            FieldValue::Array(a) => Value::Array(a),
            FieldValue::Object(o) => Value::Object(o),
        }
    }
}

fn canonical_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        // f64 Display prints integral values without a fraction ("1", not
        // "1.0"), which lines them up with the integer branches above.
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Type-tagged, canonical text of an indexable scalar.
///
/// The token is unescaped; the key encoder escapes it when it is placed
/// into a key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexToken(String);

impl IndexToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for IndexToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexToken({:?})", self.0)
    }
}
