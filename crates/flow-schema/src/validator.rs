use std::fmt;

use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One schema rule a document failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer into the document (`""` for the document root).
    pub path: String,
    /// JSON pointer into the schema naming the failed keyword.
    pub rule: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {} ({})", self.message, self.rule)
    }
}

/// A compiled stream schema.
pub struct SchemaValidator {
    compiled: JSONSchema,
}

impl SchemaValidator {
    /// Compile a schema document. The error carries the compiler's message.
    pub fn compile(schema: &Value) -> Result<Self, String> {
        JSONSchema::compile(schema)
            .map(|compiled| Self { compiled })
            .map_err(|e| e.to_string())
    }

    /// Every violation of `document`, in the validator's report order.
    /// Empty when the document conforms.
    pub fn validate(&self, document: &Value) -> Vec<Violation> {
        match self.compiled.validate(document) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| Violation {
                    path: e.instance_path.to_string(),
                    rule: e.schema_path.to_string(),
                    message: e.to_string(),
                })
                .collect(),
        }
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        self.compiled.is_valid(document)
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer", "minimum": 0}
            },
            "required": ["name"]
        })
    }

    #[test]
    fn conforming_document_has_no_violations() {
        let v = SchemaValidator::compile(&person_schema()).unwrap();
        assert!(v.validate(&json!({"name": "ada", "age": 36})).is_empty());
        assert!(v.is_valid(&json!({"name": "ada"})));
    }

    #[test]
    fn violations_carry_path_and_rule() {
        let v = SchemaValidator::compile(&person_schema()).unwrap();
        let violations = v.validate(&json!({"name": "ada", "age": -1}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "/age");
        assert!(violations[0].rule.ends_with("minimum"));
        assert!(!violations[0].message.is_empty());
    }

    #[test]
    fn missing_required_field_reported_at_root() {
        let v = SchemaValidator::compile(&person_schema()).unwrap();
        let violations = v.validate(&json!({"age": 3}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "");
        assert!(violations[0].rule.ends_with("required"));
        assert!(violations[0].to_string().starts_with("/: "));
    }

    #[test]
    fn all_violations_are_reported() {
        let v = SchemaValidator::compile(&person_schema()).unwrap();
        let violations = v.validate(&json!({"name": 5, "age": "old"}));
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn permissive_schema_accepts_anything() {
        let v = SchemaValidator::compile(&json!({})).unwrap();
        assert!(v.validate(&json!({"anything": [1, 2, 3]})).is_empty());
    }

    #[test]
    fn broken_schema_fails_to_compile() {
        assert!(SchemaValidator::compile(&json!({"type": "not-a-type"})).is_err());
        assert!(SchemaValidator::compile(&json!({"minimum": "zero"})).is_err());
    }
}
