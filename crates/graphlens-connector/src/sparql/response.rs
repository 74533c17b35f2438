//! SPARQL 1.1 JSON results
//!
//! `{ head: { vars }, results: { bindings: [...] } }` for SELECT and
//! CONSTRUCT-as-bindings, `{ head, boolean }` for ASK.

use crate::error::{ConnectorError, ConnectorResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One RDF term of a binding
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum RdfTerm {
    #[serde(rename = "uri")]
    Iri { value: String },
    #[serde(rename = "bnode")]
    BlankNode { value: String },
    #[serde(rename = "literal", alias = "typed-literal")]
    Literal {
        value: String,
        #[serde(default)]
        datatype: Option<String>,
        #[serde(rename = "xml:lang", default)]
        lang: Option<String>,
    },
}

impl RdfTerm {
    pub fn value(&self) -> &str {
        match self {
            Self::Iri { value } | Self::BlankNode { value } | Self::Literal { value, .. } => value,
        }
    }

    pub fn is_resource(&self) -> bool {
        !matches!(self, Self::Literal { .. })
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::BlankNode { .. })
    }

    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri { value: value.into() }
    }

    pub fn blank(value: impl Into<String>) -> Self {
        Self::BlankNode { value: value.into() }
    }

    pub fn literal(value: impl Into<String>, datatype: Option<&str>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: datatype.map(str::to_string),
            lang: None,
        }
    }
}

pub type Binding = BTreeMap<String, RdfTerm>;

#[derive(Debug, Clone, PartialEq)]
pub enum SparqlResponse {
    Boolean(bool),
    Bindings { vars: Vec<String>, rows: Vec<Binding> },
}

#[derive(Deserialize)]
struct Head {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct Results {
    bindings: Vec<Binding>,
}

#[derive(Deserialize)]
struct SelectBody {
    #[serde(default)]
    head: Option<Head>,
    results: Results,
}

impl SparqlResponse {
    pub fn decode(body: &Value) -> ConnectorResult<Self> {
        if let Some(boolean) = body.get("boolean") {
            return boolean
                .as_bool()
                .map(Self::Boolean)
                .ok_or_else(|| ConnectorError::validation("ASK 'boolean' must be a boolean"));
        }
        let select = SelectBody::deserialize(body)
            .map_err(|e| ConnectorError::validation(format!("invalid SPARQL results: {e}")))?;
        Ok(Self::Bindings {
            vars: select.head.map(|h| h.vars).unwrap_or_default(),
            rows: select.results.bindings,
        })
    }

    /// Binding rows; an ASK answer is rejected
    pub fn into_rows(self) -> ConnectorResult<Vec<Binding>> {
        match self {
            Self::Bindings { rows, .. } => Ok(rows),
            Self::Boolean(_) => Err(ConnectorError::validation("expected bindings, got an ASK answer")),
        }
    }
}

pub fn decode_rows(body: &Value) -> ConnectorResult<Vec<Binding>> {
    SparqlResponse::decode(body)?.into_rows()
}

pub fn term<'a>(row: &'a Binding, var: &str) -> ConnectorResult<&'a RdfTerm> {
    row.get(var)
        .ok_or_else(|| ConnectorError::validation(format!("binding is missing '?{var}'")))
}

pub fn resource<'a>(row: &'a Binding, var: &str) -> ConnectorResult<&'a RdfTerm> {
    let term = term(row, var)?;
    if term.is_resource() {
        Ok(term)
    } else {
        Err(ConnectorError::validation(format!("'?{var}' must be a resource, got a literal")))
    }
}

pub fn iri<'a>(row: &'a Binding, var: &str) -> ConnectorResult<&'a str> {
    match term(row, var)? {
        RdfTerm::Iri { value } => Ok(value),
        other => Err(ConnectorError::validation(format!(
            "'?{var}' must be an IRI, got {}",
            other.value()
        ))),
    }
}

/// Integer value of a count literal
pub fn count(row: &Binding, var: &str) -> ConnectorResult<u64> {
    let value = term(row, var)?.value();
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConnectorError::validation(format!("'?{var}' is not a count: {value}")))
}

/// A `(subject, predicate, object)` binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: RdfTerm,
    pub predicate: String,
    pub object: RdfTerm,
}

impl Triple {
    pub fn from_row(row: &Binding) -> ConnectorResult<Self> {
        Ok(Self {
            subject: resource(row, "subject")?.clone(),
            predicate: iri(row, "predicate")?.to_string(),
            object: term(row, "object")?.clone(),
        })
    }
}

pub fn triples(rows: &[Binding]) -> ConnectorResult<Vec<Triple>> {
    rows.iter().map(Triple::from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_select_terms() {
        let body = json!({
            "head": { "vars": ["subject", "predicate", "object"] },
            "results": { "bindings": [{
                "subject": { "type": "uri", "value": "http://a/s" },
                "predicate": { "type": "uri", "value": "http://a/code" },
                "object": { "type": "literal", "value": "SEA", "xml:lang": "en" }
            }, {
                "subject": { "type": "bnode", "value": "b0" },
                "predicate": { "type": "uri", "value": "http://a/runways" },
                "object": { "type": "typed-literal", "value": "3", "datatype": "http://www.w3.org/2001/XMLSchema#integer" }
            }]}
        });
        let SparqlResponse::Bindings { vars, rows } = SparqlResponse::decode(&body).unwrap() else {
            panic!("expected bindings");
        };
        assert_eq!(vars, vec!["subject", "predicate", "object"]);
        let triples = triples(&rows).unwrap();
        assert_eq!(
            triples[0].object,
            RdfTerm::Literal { value: "SEA".into(), datatype: None, lang: Some("en".into()) }
        );
        assert!(triples[1].subject.is_blank());
        assert_eq!(
            triples[1].object,
            RdfTerm::literal("3", Some("http://www.w3.org/2001/XMLSchema#integer"))
        );
    }

    #[test]
    fn test_decode_ask() {
        let body = json!({ "head": {}, "boolean": true });
        assert_eq!(SparqlResponse::decode(&body).unwrap(), SparqlResponse::Boolean(true));
        assert!(decode_rows(&body).is_err());
    }

    #[test]
    fn test_unknown_term_kind_is_invalid() {
        let body = json!({ "head": { "vars": ["x"] }, "results": { "bindings": [{ "x": { "type": "triple", "value": "?" } }] } });
        assert!(matches!(SparqlResponse::decode(&body), Err(ConnectorError::Validation(_))));
    }

    #[test]
    fn test_literal_subject_is_invalid() {
        let row: Binding = [
            ("subject".to_string(), RdfTerm::literal("x", None)),
            ("predicate".to_string(), RdfTerm::iri("http://a/p")),
            ("object".to_string(), RdfTerm::iri("http://a/o")),
        ]
        .into_iter()
        .collect();
        assert!(Triple::from_row(&row).is_err());
    }

    #[test]
    fn test_missing_results_is_invalid() {
        assert!(SparqlResponse::decode(&json!({ "head": { "vars": [] } })).is_err());
    }
}
