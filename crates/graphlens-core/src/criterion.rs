//! Attribute filters used by neighbor expansion and keyword search
//!
//! Each compiler owns its own `(data type, operator) -> clause` table; this
//! module only defines the shared vocabulary plus [`Criterion::matches`], the
//! client-side evaluation used when filtering cached blank-node neighbors.

use crate::model::{parse_date, EntityValue};
use regex::RegexBuilder;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    #[default]
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Neq,
    /// Case-insensitive substring
    Like,
}

impl Operator {
    /// Parse either spelling of an operator; anything unknown is `Eq`
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "gt" | ">" => Self::Gt,
            "gte" | ">=" => Self::Gte,
            "lt" | "<" => Self::Lt,
            "lte" | "<=" => Self::Lte,
            "neq" | "!=" => Self::Neq,
            "like" => Self::Like,
            _ => Self::Eq,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Neq => "neq",
            Self::Like => "like",
        }
    }

    /// Infix comparison symbol shared by openCypher and SPARQL
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq | Self::Like => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Neq => "!=",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq | Self::Like => ordering == Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
            Self::Neq => ordering != Ordering::Equal,
        }
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of an attribute; selects the compiler translation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttributeDataType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
}

impl AttributeDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
        }
    }
}

impl fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attribute filter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub name: String,
    #[serde(default)]
    pub operator: Operator,
    /// Raw comparison value; numbers are accepted and kept as text
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<AttributeDataType>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "criterion value must be a string or number, got {other}"
        ))),
    }
}

impl Criterion {
    pub fn new(name: impl Into<String>, operator: Operator, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            operator,
            value: value.to_string(),
            data_type: None,
        }
    }

    pub fn eq(name: impl Into<String>, value: impl ToString) -> Self {
        Self::new(name, Operator::Eq, value)
    }

    pub fn like(name: impl Into<String>, value: impl ToString) -> Self {
        Self::new(name, Operator::Like, value)
    }

    pub fn with_data_type(mut self, data_type: AttributeDataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Declared type, `String` when unspecified
    pub fn effective_data_type(&self) -> AttributeDataType {
        self.data_type.unwrap_or_default()
    }

    /// Evaluate against a materialized attribute value
    ///
    /// A missing attribute never matches.
    pub fn matches(&self, value: Option<&EntityValue>) -> bool {
        let Some(value) = value else {
            return false;
        };

        if self.operator == Operator::Like {
            let pattern = regex::escape(&self.value);
            return RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map(|re| re.is_match(&value.to_string()))
                .unwrap_or(false);
        }

        let ordering = match self.effective_data_type() {
            AttributeDataType::Number => self
                .value
                .trim()
                .parse::<f64>()
                .ok()
                .zip(value.as_f64())
                .and_then(|(wanted, actual)| actual.partial_cmp(&wanted)),
            AttributeDataType::Date => parse_date(&self.value)
                .zip(value.as_date())
                .map(|(wanted, actual)| actual.cmp(&wanted)),
            AttributeDataType::Boolean | AttributeDataType::String => None,
        };

        match ordering {
            Some(ordering) => self.operator.accepts(ordering),
            None => self.operator.accepts(value.to_string().as_str().cmp(self.value.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("eq", Operator::Eq)]
    #[test_case("==", Operator::Eq)]
    #[test_case("gt", Operator::Gt)]
    #[test_case(">", Operator::Gt)]
    #[test_case(">=", Operator::Gte)]
    #[test_case("lt", Operator::Lt)]
    #[test_case("<=", Operator::Lte)]
    #[test_case("!=", Operator::Neq)]
    #[test_case("LIKE", Operator::Like)]
    #[test_case("contains", Operator::Eq ; "unknown falls back to eq")]
    fn test_operator_parse(text: &str, expected: Operator) {
        assert_eq!(Operator::parse(text), expected);
    }

    #[test]
    fn test_criterion_deserializes_numeric_value() {
        let c: Criterion = serde_json::from_str(
            r#"{"name":"longest","operator":"gte","value":10000,"dataType":"Number"}"#,
        )
        .unwrap();
        assert_eq!(c.value, "10000");
        assert_eq!(c.operator, Operator::Gte);
        assert_eq!(c.data_type, Some(AttributeDataType::Number));
    }

    #[test_case(Operator::Gte, "10000", 12000.0, true)]
    #[test_case(Operator::Gte, "10000", 10000.0, true)]
    #[test_case(Operator::Gt, "10000", 10000.0, false)]
    #[test_case(Operator::Lt, "9", 10.0, false ; "numeric not lexical")]
    #[test_case(Operator::Neq, "5", 5.0, false)]
    fn test_numeric_matches(op: Operator, wanted: &str, actual: f64, expected: bool) {
        let c = Criterion::new("n", op, wanted).with_data_type(AttributeDataType::Number);
        assert_eq!(c.matches(Some(&EntityValue::Number(actual))), expected);
    }

    #[test]
    fn test_like_is_case_insensitive_substring() {
        let c = Criterion::like("name", "sea.");
        assert!(!c.matches(Some(&EntityValue::from("Seattle"))));
        assert!(c.matches(Some(&EntityValue::from("SEA.TAC"))));
    }

    #[test]
    fn test_missing_attribute_never_matches() {
        assert!(!Criterion::new("x", Operator::Neq, "a").matches(None));
    }

    #[test]
    fn test_date_comparison() {
        let c = Criterion::new("founded", Operator::Lt, "2000-01-01")
            .with_data_type(AttributeDataType::Date);
        assert!(c.matches(Some(&EntityValue::date_from_str("1999-12-31"))));
        assert!(!c.matches(Some(&EntityValue::date_from_str("2001-01-01"))));
    }
}
