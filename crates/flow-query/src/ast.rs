//! Query syntax tree.
//!
//! A query is in disjunctive normal form: a list of OR groups, each a list
//! of AND-ed conditions. `Display` renders the canonical text of a query,
//! which parses back to an equal tree.

use std::fmt;

use serde_json::Number;

use flow_types::{FieldValue, IndexToken};

#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub or_groups: Vec<OrGroup>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrGroup {
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub negated: bool,
    /// Field name; dotted segments are joined with `.`.
    pub field: String,
    pub operator: Operator,
    pub value: Literal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// Right-hand side of a condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(Number),
    String(String),
    Boolean(bool),
    Null,
    /// `*`: any value, i.e. the field is present.
    Wildcard,
}

impl Literal {
    /// Index token of a concrete value; `None` for the wildcard.
    pub fn index_token(&self) -> Option<IndexToken> {
        let value = match self {
            Self::Number(n) => FieldValue::Number(n.clone()),
            Self::String(s) => FieldValue::String(s.clone()),
            Self::Boolean(b) => FieldValue::Bool(*b),
            Self::Null => FieldValue::Null,
            Self::Wildcard => return None,
        };
        value.index_token()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.or_groups.iter().enumerate() {
            if i > 0 {
                f.write_str(" OR ")?;
            }
            write!(f, "{group}")?;
        }
        Ok(())
    }
}

impl fmt::Display for OrGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{condition}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("NOT ")?;
        }
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            // Strings cannot hold their own delimiter, so one of the two
            // quote styles always fits.
            Self::String(s) if s.contains('"') => write!(f, "'{s}'"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Null => f.write_str("NULL"),
            Self::Wildcard => f.write_str("*"),
        }
    }
}
