//! openCypher compiler.
//!
//! Identifiers are always quoted strings. Neighbor expansion first selects
//! a distinct, paginated set of neighbors and then re-matches them to collect
//! the connecting relationships:
//!
//! ```text
//! MATCH (v)-[e]-(tgt) WHERE ID(v) = "1" AND tgt:airport
//! WITH DISTINCT v, tgt ORDER BY ID(tgt) LIMIT 10
//! MATCH (v)-[e]-(tgt)
//! WITH collect(DISTINCT tgt) AS vObjects, collect(DISTINCT e) AS eObjects
//! RETURN vObjects, eObjects
//! ```

use crate::error::CompileError;
use crate::literal::{
    boolean_literal, is_identifier, number_literal, quoted, split_all_types, split_types,
};
use crate::render::{page, QueryCompiler};
use graphlens_core::{
    AttributeDataType, Criterion, EdgeId, EntityId, IdentityError, KeywordSearchRequest,
    NeighborsCountRequest, NeighborsRequest, Operator, VertexId,
};
use std::fmt;

/// Backtick-quote a name unless it is a plain identifier
fn symbolic_name(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

fn property(var: &str, name: &str) -> String {
    format!("{var}.{}", symbolic_name(name))
}

fn list(items: impl IntoIterator<Item = String>) -> String {
    format!("[{}]", items.into_iter().collect::<Vec<_>>().join(", "))
}

/// `tgt:A` or `(tgt:A OR tgt:B)`; `None` for an unfiltered request
fn label_condition(var: &str, types: &[String]) -> Option<String> {
    let labels: Vec<String> = split_all_types(types)
        .into_iter()
        .map(|label| format!("{var}:{}", symbolic_name(label)))
        .collect();
    match labels.len() {
        0 => None,
        1 => labels.into_iter().next(),
        _ => Some(format!("({})", labels.join(" OR "))),
    }
}

fn contains_ignore_case(left: &str, term: &str) -> String {
    format!("toLower({left}) CONTAINS toLower({})", quoted(term))
}

/// Clause list rendered as one line
#[derive(Debug, Default)]
struct CypherQuery {
    clauses: Vec<String>,
}

impl CypherQuery {
    fn new() -> Self {
        Self::default()
    }

    fn clause(mut self, keyword: &str, body: impl AsRef<str>) -> Self {
        self.clauses.push(format!("{keyword} {}", body.as_ref()));
        self
    }

    fn where_all(self, conditions: Vec<String>) -> Self {
        if conditions.is_empty() {
            self
        } else {
            self.clause("WHERE", conditions.join(" AND "))
        }
    }

    fn paginate(self, limit: usize, offset: usize) -> Self {
        match page(limit, offset) {
            (Some(l), Some(o)) => self.clause("SKIP", o.to_string()).clause("LIMIT", l.to_string()),
            (Some(l), None) => self.clause("LIMIT", l.to_string()),
            _ => self,
        }
    }
}

impl fmt::Display for CypherQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(" "))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCypherCompiler;

impl OpenCypherCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Identifier literal; every id is compared as a string
    pub fn id_param(&self, id: &EntityId) -> String {
        quoted(&id.to_string())
    }

    fn source_of(request_id: Option<&VertexId>) -> Result<&VertexId, CompileError> {
        request_id.ok_or_else(|| IdentityError::new("", "request has no vertex id").into())
    }

    /// `(dataType, operator) -> condition` table
    fn condition(var: &str, criterion: &Criterion) -> String {
        let left = property(var, &criterion.name);
        if criterion.operator == Operator::Like {
            return contains_ignore_case(&left, &criterion.value);
        }

        let value = match criterion.effective_data_type() {
            AttributeDataType::Number => {
                number_literal(&criterion.value).unwrap_or_else(|| quoted(&criterion.value))
            }
            AttributeDataType::Boolean => boolean_literal(&criterion.value)
                .map(str::to_string)
                .unwrap_or_else(|| quoted(&criterion.value)),
            AttributeDataType::Date => format!("datetime({})", quoted(&criterion.value)),
            AttributeDataType::String => quoted(&criterion.value),
        };

        let symbol = match criterion.operator {
            Operator::Neq => "<>",
            op => op.symbol(),
        };
        format!("{left} {symbol} {value}")
    }

    fn relationship(var: &str, edge_types: &[String]) -> String {
        let labels: Vec<String> = split_all_types(edge_types)
            .into_iter()
            .map(symbolic_name)
            .collect();
        if labels.is_empty() {
            var.to_string()
        } else {
            format!("{var}:{}", labels.join("|"))
        }
    }

    /// Vertex totals per label set
    pub fn vertex_label_counts(&self) -> String {
        CypherQuery::new()
            .clause("MATCH", "(v)")
            .clause("RETURN", "labels(v) AS label, count(v) AS count")
            .to_string()
    }

    /// Edge totals per relationship type
    pub fn edge_label_counts(&self) -> String {
        CypherQuery::new()
            .clause("MATCH", "()-[e]->()")
            .clause("RETURN", "type(e) AS label, count(e) AS count")
            .to_string()
    }

    /// Sample vertices carrying every label of a possibly compound type
    pub fn vertex_samples(&self, vertex_type: &str, limit: usize) -> String {
        let labels: Vec<String> = split_types(vertex_type)
            .into_iter()
            .map(symbolic_name)
            .collect();
        let pattern = if labels.is_empty() {
            "(v)".to_string()
        } else {
            format!("(v:{})", labels.join(":"))
        };
        CypherQuery::new()
            .clause("MATCH", pattern)
            .clause("RETURN", "v")
            .paginate(limit, 0)
            .to_string()
    }

    pub fn edge_samples(&self, edge_type: &str, limit: usize) -> String {
        let rel = Self::relationship("e", &[edge_type.to_string()]);
        CypherQuery::new()
            .clause("MATCH", format!("()-[{rel}]->()"))
            .clause("RETURN", "e")
            .paginate(limit, 0)
            .to_string()
    }

    /// Source/target label sets per relationship type; all types when empty
    pub fn edge_connections(&self, edge_types: &[String]) -> String {
        let mut conditions = Vec::new();
        let types = split_all_types(edge_types);
        if !types.is_empty() {
            conditions.push(format!("type(e) IN {}", list(types.into_iter().map(quoted))));
        }
        CypherQuery::new()
            .clause("MATCH", "(source)-[e]->(target)")
            .where_all(conditions)
            .clause(
                "RETURN",
                "labels(source) AS sourceLabels, type(e) AS edgeType, labels(target) AS targetLabels, count(e) AS count",
            )
            .to_string()
    }
}

impl QueryCompiler for OpenCypherCompiler {
    fn name(&self) -> &str {
        "openCypher"
    }

    fn neighbors(&self, request: &NeighborsRequest) -> Result<String, CompileError> {
        let source = self.id_param(Self::source_of(request.vertex_id.as_ref())?.entity());
        let rel = Self::relationship("e", request.edge_type_filter());

        let mut conditions = vec![format!("ID(v) = {source}")];
        conditions.extend(label_condition("tgt", request.vertex_types()));
        if !request.excluded_vertices.is_empty() {
            conditions.push(format!(
                "NOT ID(tgt) IN {}",
                list(request.excluded_vertices.iter().map(|id| self.id_param(id.entity())))
            ));
        }
        conditions.extend(
            request
                .filter_criteria
                .iter()
                .map(|c| Self::condition("tgt", c)),
        );

        Ok(CypherQuery::new()
            .clause("MATCH", format!("(v)-[{rel}]-(tgt)"))
            .where_all(conditions)
            .clause("WITH", "DISTINCT v, tgt")
            .clause("ORDER BY", "ID(tgt)")
            .paginate(request.limit, request.offset)
            .clause("MATCH", format!("(v)-[{rel}]-(tgt)"))
            .clause(
                "WITH",
                "collect(DISTINCT tgt) AS vObjects, collect(DISTINCT e) AS eObjects",
            )
            .clause("RETURN", "vObjects, eObjects")
            .to_string())
    }

    fn neighbor_counts(&self, request: &NeighborsCountRequest) -> Result<String, CompileError> {
        let source = self.id_param(Self::source_of(request.vertex_id.as_ref())?.entity());

        Ok(CypherQuery::new()
            .clause("MATCH", "(v)-[]-(neighbor)")
            .clause("WHERE", format!("ID(v) = {source}"))
            .clause("WITH", "DISTINCT neighbor")
            .paginate(request.limit.unwrap_or(0), 0)
            .clause(
                "RETURN",
                "labels(neighbor) AS vertexLabels, count(neighbor) AS count",
            )
            .to_string())
    }

    fn keyword_search(&self, request: &KeywordSearchRequest) -> Result<String, CompileError> {
        let mut conditions: Vec<String> = label_condition("v", &request.vertex_types)
            .into_iter()
            .collect();

        if let Some(term) = request.term() {
            let matches = |left: &str| {
                if request.exact_match {
                    format!("{left} = {}", quoted(term))
                } else {
                    contains_ignore_case(left, term)
                }
            };

            let mut alternatives: Vec<String> = request
                .attribute_names()
                .map(|name| matches(&property("v", name)))
                .collect();
            if request.searches_id() {
                alternatives.push(matches("ID(v)"));
            }
            if alternatives.is_empty() {
                alternatives.push(format!(
                    "ANY(key IN keys(v) WHERE {})",
                    matches("toString(v[key])")
                ));
            }

            conditions.push(if alternatives.len() == 1 {
                alternatives.remove(0)
            } else {
                format!("({})", alternatives.join(" OR "))
            });
        }

        Ok(CypherQuery::new()
            .clause("MATCH", "(v)")
            .where_all(conditions)
            .clause("RETURN", "v")
            .paginate(request.limit, request.offset)
            .to_string())
    }

    fn vertex_details(&self, ids: &[VertexId]) -> Result<String, CompileError> {
        Ok(CypherQuery::new()
            .clause("MATCH", "(v)")
            .clause(
                "WHERE",
                format!("ID(v) IN {}", list(ids.iter().map(|id| self.id_param(id.entity())))),
            )
            .clause("RETURN", "v")
            .to_string())
    }

    fn edge_details(&self, ids: &[EdgeId]) -> Result<String, CompileError> {
        Ok(CypherQuery::new()
            .clause("MATCH", "()-[e]->()")
            .clause(
                "WHERE",
                format!("ID(e) IN {}", list(ids.iter().map(|id| self.id_param(id.entity())))),
            )
            .clause("RETURN", "e")
            .to_string())
    }

    fn vertex_count_by_type(&self, vertex_type: &str) -> Result<String, CompileError> {
        Ok(CypherQuery::new()
            .clause("MATCH", "(v)")
            .where_all(label_condition("v", &[vertex_type.to_string()]).into_iter().collect())
            .clause("RETURN", "count(v) AS total")
            .to_string())
    }
}
