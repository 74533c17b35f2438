//! Gremlin compiler.
//!
//! Produces Groovy-style traversal strings for script endpoints. Neighbor
//! expansion projects every neighbor together with the edges that connect
//! it to the source vertex:
//!
//! ```text
//! g.V("1").both().hasLabel("airport").dedup().limit(10)
//!  .project("vertex","edges").by().by(__.bothE().where(__.otherV().hasId("1")).fold())
//! ```

use crate::error::CompileError;
use crate::literal::{boolean_literal, literal_pattern, number_literal, quoted, split_all_types};
use crate::render::{page, QueryCompiler};
use graphlens_core::{
    AttributeDataType, Criterion, EdgeId, EntityId, IdType, IdentityError, KeywordSearchRequest,
    NeighborsCountRequest, NeighborsRequest, Operator, VertexId,
};
use std::fmt;

/// Gremlin string literal; `$` is escaped against Groovy interpolation
pub fn gremlin_string(text: &str) -> String {
    quoted(text).replace('$', "\\$")
}

fn regex_predicate(term: &str) -> String {
    format!(
        "TextP.regex({})",
        gremlin_string(&format!("(?i){}", literal_pattern(term)))
    )
}

/// Step chain builder; arguments are already rendered literals
#[derive(Debug, Clone)]
struct Traversal {
    parts: Vec<String>,
}

impl Traversal {
    fn g() -> Self {
        Self {
            parts: vec!["g".to_string()],
        }
    }

    fn anonymous() -> Self {
        Self {
            parts: vec!["__".to_string()],
        }
    }

    fn step<I, S>(mut self, name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        self.parts.push(format!("{name}({})", args.join(",")));
        self
    }

    fn bare(self, name: &str) -> Self {
        self.step(name, std::iter::empty::<&str>())
    }

    fn step_if<I, S>(self, name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        if args.is_empty() {
            self
        } else {
            self.step(name, args)
        }
    }

    fn paginate(self, limit: usize, offset: usize) -> Self {
        match page(limit, offset) {
            (Some(l), Some(o)) => self.step("range", [o.to_string(), (o + l).to_string()]),
            (Some(l), None) => self.step("limit", [l.to_string()]),
            _ => self,
        }
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

/// Gremlin compiler; `id_type` selects the vertex id literal syntax
#[derive(Debug, Clone, Copy, Default)]
pub struct GremlinCompiler {
    id_type: IdType,
}

impl GremlinCompiler {
    pub fn new(id_type: IdType) -> Self {
        Self { id_type }
    }

    pub fn id_type(&self) -> IdType {
        self.id_type
    }

    /// Vertex id literal
    ///
    /// Numeric ids become long literals (`42L`). With [`IdType::Number`] a
    /// textual id must be an integer, otherwise the request targets the wrong
    /// identifier domain and is rejected.
    pub fn id_param(&self, id: &EntityId) -> Result<String, CompileError> {
        match (id, self.id_type) {
            (EntityId::Number(n), _) => Ok(format!("{n}L")),
            (EntityId::String(s), IdType::Number) => s
                .trim()
                .parse::<i64>()
                .map(|n| format!("{n}L"))
                .map_err(|_| IdentityError::new(s.as_str(), "expected a numeric vertex id").into()),
            (EntityId::String(s), IdType::String) => Ok(gremlin_string(s)),
        }
    }

    /// Edge id literal; edge ids keep their reported domain
    pub fn edge_id_param(&self, id: &EdgeId) -> String {
        match id.entity() {
            EntityId::Number(n) => format!("{n}L"),
            EntityId::String(s) => gremlin_string(s),
        }
    }

    fn vertex_ids(&self, ids: &[VertexId]) -> Result<Vec<String>, CompileError> {
        ids.iter().map(|id| self.id_param(id.entity())).collect()
    }

    /// `(dataType, operator) -> predicate` table
    fn predicate(criterion: &Criterion) -> String {
        if criterion.operator == Operator::Like {
            return regex_predicate(&criterion.value);
        }

        let value = match criterion.effective_data_type() {
            AttributeDataType::Number => {
                number_literal(&criterion.value).unwrap_or_else(|| gremlin_string(&criterion.value))
            }
            AttributeDataType::Boolean => boolean_literal(&criterion.value)
                .map(str::to_string)
                .unwrap_or_else(|| gremlin_string(&criterion.value)),
            AttributeDataType::Date => format!("datetime({})", gremlin_string(&criterion.value)),
            AttributeDataType::String => gremlin_string(&criterion.value),
        };

        format!("{}({value})", criterion.operator.as_str())
    }

    fn has_clause(criterion: &Criterion) -> String {
        format!(
            "has({},{})",
            gremlin_string(&criterion.name),
            Self::predicate(criterion)
        )
    }

    fn labels(types: &[String]) -> Vec<String> {
        split_all_types(types)
            .into_iter()
            .map(gremlin_string)
            .collect()
    }

    fn source_of(request_id: Option<&VertexId>) -> Result<&VertexId, CompileError> {
        request_id.ok_or_else(|| IdentityError::new("", "request has no vertex id").into())
    }

    /// Vertex totals per label
    pub fn vertex_label_counts(&self) -> String {
        Traversal::g().bare("V").bare("groupCount").step("by", ["label"]).to_string()
    }

    /// Edge totals per label
    pub fn edge_label_counts(&self) -> String {
        Traversal::g().bare("E").bare("groupCount").step("by", ["label"]).to_string()
    }

    /// Sample vertices of one type for attribute discovery
    pub fn vertex_samples(&self, vertex_type: &str, limit: usize) -> String {
        Traversal::g()
            .bare("V")
            .step_if("hasLabel", Self::labels(&[vertex_type.to_string()]))
            .paginate(limit, 0)
            .to_string()
    }

    /// Sample edges of one type for attribute discovery
    pub fn edge_samples(&self, edge_type: &str, limit: usize) -> String {
        Traversal::g()
            .bare("E")
            .step_if("hasLabel", Self::labels(&[edge_type.to_string()]))
            .paginate(limit, 0)
            .to_string()
    }

    /// Source/target label pairs of one edge type with their counts
    pub fn edge_connections(&self, edge_type: &str) -> String {
        let endpoints = Traversal::anonymous()
            .step("project", [gremlin_string("source"), gremlin_string("target")])
            .step("by", [Traversal::anonymous().bare("outV").bare("label").to_string()])
            .step("by", [Traversal::anonymous().bare("inV").bare("label").to_string()]);

        Traversal::g()
            .bare("E")
            .step_if("hasLabel", Self::labels(&[edge_type.to_string()]))
            .bare("groupCount")
            .step("by", [endpoints.to_string()])
            .to_string()
    }
}

impl QueryCompiler for GremlinCompiler {
    fn name(&self) -> &str {
        "gremlin"
    }

    fn neighbors(&self, request: &NeighborsRequest) -> Result<String, CompileError> {
        let source = self.id_param(Self::source_of(request.vertex_id.as_ref())?.entity())?;
        let edge_labels = Self::labels(request.edge_type_filter());

        let mut traversal = Traversal::g()
            .step("V", [&source])
            .step("both", &edge_labels)
            .step_if("hasLabel", Self::labels(request.vertex_types()));

        match request.filter_criteria.as_slice() {
            [] => {}
            [criterion] => traversal.parts.push(Self::has_clause(criterion)),
            criteria => {
                traversal = traversal.step(
                    "and",
                    criteria.iter().map(|c| format!("__.{}", Self::has_clause(c))),
                )
            }
        }

        let excluded: Vec<VertexId> = request.excluded_vertices.iter().cloned().collect();
        if !excluded.is_empty() {
            let has_id = Traversal::anonymous().step("hasId", self.vertex_ids(&excluded)?);
            traversal = traversal.step("not", [has_id.to_string()]);
        }

        let connecting_edges = Traversal::anonymous()
            .step("bothE", &edge_labels)
            .step(
                "where",
                [Traversal::anonymous()
                    .bare("otherV")
                    .step("hasId", [&source])
                    .to_string()],
            )
            .bare("fold");

        Ok(traversal
            .bare("dedup")
            .paginate(request.limit, request.offset)
            .step("project", [gremlin_string("vertex"), gremlin_string("edges")])
            .bare("by")
            .step("by", [connecting_edges.to_string()])
            .to_string())
    }

    fn neighbor_counts(&self, request: &NeighborsCountRequest) -> Result<String, CompileError> {
        let source = self.id_param(Self::source_of(request.vertex_id.as_ref())?.entity())?;

        Ok(Traversal::g()
            .step("V", [source])
            .bare("both")
            .bare("dedup")
            .paginate(request.limit.unwrap_or(0), 0)
            .bare("groupCount")
            .step("by", ["label"])
            .to_string())
    }

    fn keyword_search(&self, request: &KeywordSearchRequest) -> Result<String, CompileError> {
        let mut traversal = Traversal::g()
            .bare("V")
            .step_if("hasLabel", Self::labels(&request.vertex_types));

        if let Some(term) = request.term() {
            let value_predicate = if request.exact_match {
                gremlin_string(term)
            } else {
                regex_predicate(term)
            };

            let mut clauses: Vec<String> = request
                .attribute_names()
                .map(|name| format!("__.has({},{value_predicate})", gremlin_string(name)))
                .collect();

            if request.searches_id() {
                let id_clause = if request.exact_match {
                    // A term outside the id domain can only match nothing
                    let id = self
                        .id_param(&EntityId::from(term))
                        .unwrap_or_else(|_| gremlin_string(term));
                    Traversal::anonymous().step("hasId", [id])
                } else {
                    Traversal::anonymous().step("has", ["T.id".to_string(), regex_predicate(term)])
                };
                clauses.push(id_clause.to_string());
            }

            traversal = if clauses.is_empty() {
                let any_value = Traversal::anonymous()
                    .bare("properties")
                    .step("hasValue", [value_predicate]);
                traversal.step("where", [any_value.to_string()])
            } else {
                traversal.step("or", clauses)
            };
        }

        Ok(traversal
            .bare("dedup")
            .paginate(request.limit, request.offset)
            .to_string())
    }

    fn vertex_details(&self, ids: &[VertexId]) -> Result<String, CompileError> {
        Ok(Traversal::g().step("V", self.vertex_ids(ids)?).to_string())
    }

    fn edge_details(&self, ids: &[EdgeId]) -> Result<String, CompileError> {
        Ok(Traversal::g()
            .step("E", ids.iter().map(|id| self.edge_id_param(id)))
            .to_string())
    }

    fn vertex_count_by_type(&self, vertex_type: &str) -> Result<String, CompileError> {
        Ok(Traversal::g()
            .bare("V")
            .step_if("hasLabel", Self::labels(&[vertex_type.to_string()]))
            .bare("count")
            .to_string())
    }
}
