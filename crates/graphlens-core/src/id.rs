//! Opaque entity identifiers
//!
//! Backends disagree on identifier domains: Gremlin servers commonly use
//! longs, openCypher uses strings and RDF uses IRIs or blank-node labels.
//! [`EntityId`] keeps whichever domain the backend reported; the compilers'
//! `id_param` functions decide how it is written back into a query.
//!
//! RDF triples have no identity of their own, so RDF edges use the synthetic
//! id format `{source}-[{predicate}]->{target}` (see [`RdfEdgeId`]).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An identifier that cannot be read in its expected domain
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier '{id}': {reason}")]
pub struct IdentityError {
    /// The offending identifier
    pub id: String,
    /// What was expected
    pub reason: String,
}

impl IdentityError {
    /// Create a new identity error
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// String-or-number identifier as reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Numeric id (Gremlin longs)
    Number(i64),
    /// Textual id (strings, IRIs, blank-node labels)
    String(String),
}

impl EntityId {
    /// The id as text, regardless of domain
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Borrow the textual form when the id is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

macro_rules! entity_id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(EntityId);

        impl $name {
            /// Wrap a backend identifier
            pub fn new(id: impl Into<EntityId>) -> Self {
                Self(id.into())
            }

            /// The underlying string-or-number id
            pub fn entity(&self) -> &EntityId {
                &self.0
            }

            /// Borrow the textual form when the id is a string
            pub fn as_str(&self) -> Option<&str> {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<EntityId> for $name {
            fn from(id: EntityId) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(EntityId::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(EntityId::from(s))
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                Self(EntityId::from(n))
            }
        }
    };
}

entity_id_newtype!(
    /// Identifier of a vertex
    VertexId
);

entity_id_newtype!(
    /// Identifier of an edge
    EdgeId
);

static RDF_EDGE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<source>.+?)-\[(?P<predicate>[^\[\]]+)\]->(?P<target>.+)$")
        .unwrap_or_else(|e| panic!("invalid RDF edge id pattern: {e}"))
});

/// Decomposed synthetic RDF edge id: `{source}-[{predicate}]->{target}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdfEdgeId {
    /// Subject of the triple
    pub source: String,
    /// Predicate IRI
    pub predicate: String,
    /// Object of the triple
    pub target: String,
}

impl RdfEdgeId {
    /// Build an id from its parts
    pub fn new(
        source: impl Into<String>,
        predicate: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            predicate: predicate.into(),
            target: target.into(),
        }
    }

    /// Parse a synthetic id
    pub fn parse(id: &str) -> Result<Self, IdentityError> {
        let caps = RDF_EDGE_ID_RE.captures(id).ok_or_else(|| {
            IdentityError::new(id, "expected '{source}-[{predicate}]->{target}'")
        })?;

        Ok(Self::new(&caps["source"], &caps["predicate"], &caps["target"]))
    }

    /// The id as an [`EdgeId`]
    pub fn to_edge_id(&self) -> EdgeId {
        EdgeId::from(self.to_string())
    }
}

impl fmt::Display for RdfEdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-[{}]->{}", self.source, self.predicate, self.target)
    }
}

impl FromStr for RdfEdgeId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&EdgeId> for RdfEdgeId {
    type Error = IdentityError;

    fn try_from(id: &EdgeId) -> Result<Self, Self::Error> {
        match id.as_str() {
            Some(text) => Self::parse(text),
            None => Err(IdentityError::new(
                id.to_string(),
                "RDF edge ids are never numeric",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rdf_edge_id() {
        let id = RdfEdgeId::parse("http://a/s-[http://a/p]->http://a/t").unwrap();
        assert_eq!(id.source, "http://a/s");
        assert_eq!(id.predicate, "http://a/p");
        assert_eq!(id.target, "http://a/t");
    }

    #[test]
    fn test_parse_rdf_edge_id_with_dashes_in_iris() {
        let id = RdfEdgeId::parse("http://a/x-y-[http://a/has-part]->http://a/z-1").unwrap();
        assert_eq!(id.source, "http://a/x-y");
        assert_eq!(id.predicate, "http://a/has-part");
        assert_eq!(id.target, "http://a/z-1");
    }

    #[test]
    fn test_parse_rdf_edge_id_without_brackets_fails() {
        let err = RdfEdgeId::parse("http://a/s-http://a/p->http://a/t").unwrap_err();
        assert_eq!(err.id, "http://a/s-http://a/p->http://a/t");
    }

    #[test]
    fn test_rdf_edge_id_display_round_trips() {
        let id = RdfEdgeId::new("http://a/s", "http://a/p", "b0");
        let text = id.to_string();
        assert_eq!(text, "http://a/s-[http://a/p]->b0");
        assert_eq!(text.parse::<RdfEdgeId>().unwrap(), id);
    }

    #[test]
    fn test_numeric_edge_id_is_not_rdf() {
        let id = EdgeId::from(42i64);
        assert!(RdfEdgeId::try_from(&id).is_err());
    }

    #[test]
    fn test_entity_id_serde_is_untagged() {
        let ids: Vec<VertexId> = serde_json::from_str(r#"[1, "a"]"#).unwrap();
        assert_eq!(ids, vec![VertexId::from(1i64), VertexId::from("a")]);
        assert_eq!(serde_json::to_string(&ids).unwrap(), r#"[1,"a"]"#);
    }
}
