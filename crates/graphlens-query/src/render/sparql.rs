//! SPARQL compiler.
//!
//! Every entity query projects `?subject ?predicate ?object` so the mapper can
//! aggregate triples into vertices and edges. Neighbor expansion selects a
//! distinct page of neighbors in a sub-select and joins it with three
//! branches: the neighbor's own types/literals, outgoing edges from the
//! source and incoming edges to the source.
//!
//! Blank nodes cannot be addressed by label, so they are re-located by
//! embedding the sub-query that first produced them. The `blank_nodes_*`
//! functions build those locator templates; every template projects a
//! single `?bNode` variable.

use crate::error::CompileError;
use crate::literal::{boolean_literal, is_iri, literal_pattern, number_literal, quoted, split_all_types};
use crate::render::{page, QueryCompiler};
use graphlens_core::model::parse_date;
use graphlens_core::{
    AttributeDataType, Criterion, EdgeId, EntityId, KeywordSearchRequest, NeighborsCountRequest,
    NeighborsRequest, Operator, RdfEdgeId, VertexId,
};
use std::fmt;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
/// Type given to resources that carry no `rdf:type`
pub const RDFS_RESOURCE: &str = "http://www.w3.org/2000/01/rdf-schema#Resource";
const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

const TYPE: &str = "<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>";

/// `<iri>` term
pub fn iri(text: &str) -> Result<String, CompileError> {
    if is_iri(text) {
        Ok(format!("<{text}>"))
    } else {
        Err(CompileError::InvalidIri(text.to_string()))
    }
}

fn iri_list<'a>(items: impl IntoIterator<Item = &'a str>) -> Result<String, CompileError> {
    let terms = items.into_iter().map(iri).collect::<Result<Vec<_>, _>>()?;
    Ok(terms.join(", "))
}

/// Group graph pattern `{ ... }` built from already escaped parts
#[derive(Debug, Clone, Default)]
struct GroupPattern {
    parts: Vec<String>,
}

impl GroupPattern {
    fn new() -> Self {
        Self::default()
    }

    fn triple(mut self, subject: &str, predicate: &str, object: &str) -> Self {
        self.parts.push(format!("{subject} {predicate} {object} ."));
        self
    }

    fn filter(mut self, expression: impl AsRef<str>) -> Self {
        self.parts.push(format!("FILTER({})", expression.as_ref()));
        self
    }

    fn filter_if(self, expression: Option<String>) -> Self {
        match expression {
            Some(expression) => self.filter(expression),
            None => self,
        }
    }

    fn bind(mut self, expression: &str, var: &str) -> Self {
        self.parts.push(format!("BIND({expression} AS {var})"));
        self
    }

    fn values(mut self, vars: &str, rows: Vec<String>) -> Self {
        self.parts.push(format!("VALUES {vars} {{ {} }}", rows.join(" ")));
        self
    }

    fn optional(mut self, pattern: GroupPattern) -> Self {
        self.parts.push(format!("OPTIONAL {pattern}"));
        self
    }

    fn union(mut self, branches: Vec<GroupPattern>) -> Self {
        let rendered: Vec<String> = branches.iter().map(ToString::to_string).collect();
        self.parts.push(rendered.join(" UNION "));
        self
    }

    fn subquery(mut self, select: &SelectQuery) -> Self {
        self.parts.push(format!("{{ {select} }}"));
        self
    }

    /// Embed a complete, previously compiled SELECT
    fn embed(mut self, query: &str) -> Self {
        self.parts.push(format!("{{ {query} }}"));
        self
    }
}

impl fmt::Display for GroupPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            f.write_str("{ }")
        } else {
            write!(f, "{{ {} }}", self.parts.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SelectQuery {
    distinct: bool,
    projection: Vec<String>,
    pattern: GroupPattern,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl SelectQuery {
    fn new(projection: &[&str]) -> Self {
        Self {
            projection: projection.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    fn pattern(mut self, pattern: GroupPattern) -> Self {
        self.pattern = pattern;
        self
    }

    fn group_by(mut self, vars: &[&str]) -> Self {
        self.group_by = vars.iter().map(|v| v.to_string()).collect();
        self
    }

    fn order_by(mut self, vars: &[&str]) -> Self {
        self.order_by = vars.iter().map(|v| v.to_string()).collect();
        self
    }

    fn paginate(mut self, limit: usize, offset: usize) -> Self {
        (self.limit, self.offset) = page(limit, offset);
        self
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        write!(f, "{} WHERE {}", self.projection.join(" "), self.pattern)?;
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", self.group_by.join(" "))?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", self.order_by.join(" "))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

/// Pattern selecting every resource adjacent to `source` into `var`
fn adjacency(source: &str, var: &str) -> GroupPattern {
    GroupPattern::new()
        .union(vec![
            GroupPattern::new().triple(source, "?p", var),
            GroupPattern::new().triple(var, "?p", source),
        ])
        .filter(format!("!isLiteral({var}) && ?p != {TYPE}"))
}

/// The three triple branches describing a selected `?neighbor` of `source`
fn neighbor_triples(source: &str, edge_filter: Option<String>) -> GroupPattern {
    GroupPattern::new().union(vec![
        GroupPattern::new()
            .triple("?neighbor", "?predicate", "?object")
            .filter(format!("?predicate = {TYPE} || isLiteral(?object)"))
            .bind("?neighbor", "?subject"),
        GroupPattern::new()
            .triple(source, "?predicate", "?neighbor")
            .filter(format!("?predicate != {TYPE}"))
            .filter_if(edge_filter.clone())
            .bind(source, "?subject")
            .bind("?neighbor", "?object"),
        GroupPattern::new()
            .triple("?neighbor", "?predicate", source)
            .filter(format!("?predicate != {TYPE}"))
            .filter_if(edge_filter)
            .bind("?neighbor", "?subject")
            .bind(source, "?object"),
    ])
}

fn triples_query(pattern: GroupPattern) -> String {
    SelectQuery::new(&["?subject", "?predicate", "?object"])
        .pattern(pattern)
        .to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SparqlCompiler;

impl SparqlCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Resource term for a vertex id; only absolute IRIs are addressable
    pub fn id_param(&self, id: &EntityId) -> Result<String, CompileError> {
        match id {
            EntityId::String(s) => iri(s),
            EntityId::Number(n) => Err(CompileError::InvalidIri(n.to_string())),
        }
    }

    fn source_term(&self, id: Option<&VertexId>) -> Result<String, CompileError> {
        match id {
            Some(id) => self.id_param(id.entity()),
            None => Err(CompileError::InvalidIri(String::new())),
        }
    }

    /// `(dataType, operator) -> FILTER expression` table over a bound value
    fn criterion_filter(var: &str, criterion: &Criterion) -> String {
        if criterion.operator == Operator::Like {
            return format!(
                "regex(str({var}), {}, \"i\")",
                quoted(&literal_pattern(&criterion.value))
            );
        }

        let symbol = criterion.operator.symbol();
        let string_comparison = || format!("str({var}) {symbol} {}", quoted(&criterion.value));

        match criterion.effective_data_type() {
            AttributeDataType::Number => number_literal(&criterion.value)
                .map(|n| format!("{var} {symbol} {n}"))
                .unwrap_or_else(string_comparison),
            AttributeDataType::Boolean => boolean_literal(&criterion.value)
                .map(|b| format!("{var} {symbol} {b}"))
                .unwrap_or_else(string_comparison),
            AttributeDataType::Date => {
                let lexical = parse_date(&criterion.value)
                    .map(|d| d.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                    .unwrap_or_else(|| criterion.value.clone());
                format!("{var} {symbol} {}^^<{XSD_DATE_TIME}>", quoted(&lexical))
            }
            AttributeDataType::String => string_comparison(),
        }
    }

    fn class_filter(types: &[String]) -> Result<Option<String>, CompileError> {
        let classes = split_all_types(types);
        if classes.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("?class IN ({})", iri_list(classes)?)))
    }

    fn edge_filter(var: &str, edge_types: &[String]) -> Result<Option<String>, CompileError> {
        let predicates = split_all_types(edge_types);
        if predicates.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("{var} IN ({})", iri_list(predicates)?)))
    }

    /// Neighbor selection pattern binding `?neighbor`
    fn neighbor_selection(
        &self,
        source: &str,
        request: &NeighborsRequest,
    ) -> Result<GroupPattern, CompileError> {
        let mut pattern = adjacency(source, "?neighbor")
            .filter_if(Self::edge_filter("?p", request.edge_type_filter())?);

        if let Some(class_filter) = Self::class_filter(request.vertex_types())? {
            pattern = pattern
                .triple("?neighbor", TYPE, "?class")
                .filter(class_filter);
        }

        for (i, criterion) in request.filter_criteria.iter().enumerate() {
            let var = format!("?attr{i}");
            pattern = pattern
                .triple("?neighbor", &iri(&criterion.name)?, &var)
                .filter(Self::criterion_filter(&var, criterion));
        }

        // Blank-node labels cannot be referenced; callers drop those after mapping
        let excluded: Vec<&str> = request
            .excluded_vertices
            .iter()
            .filter_map(|id| id.as_str())
            .filter(|id| is_iri(id))
            .collect();
        if !excluded.is_empty() {
            pattern = pattern.filter(format!("?neighbor NOT IN ({})", iri_list(excluded)?));
        }

        Ok(pattern)
    }

    /// Keyword selection pattern binding `var`
    fn keyword_selection(
        &self,
        request: &KeywordSearchRequest,
        var: &str,
    ) -> Result<GroupPattern, CompileError> {
        let mut pattern = GroupPattern::new()
            .triple(var, TYPE, "?class")
            .filter_if(Self::class_filter(&request.vertex_types)?);

        let Some(term) = request.term() else {
            return Ok(pattern);
        };

        let value_match = |expression: &str| {
            if request.exact_match {
                format!("str({expression}) = {}", quoted(term))
            } else {
                format!(
                    "regex(str({expression}), {}, \"i\")",
                    quoted(&literal_pattern(term))
                )
            }
        };

        let attributes: Vec<&str> = request.attribute_names().collect();
        if request.searches_id() && attributes.is_empty() {
            return Ok(pattern.filter(value_match(var)));
        }

        pattern = pattern.triple(var, "?searchPredicate", "?searchValue");
        if !attributes.is_empty() {
            pattern = pattern.filter(format!("?searchPredicate IN ({})", iri_list(attributes)?));
        }

        let literal_match = format!("isLiteral(?searchValue) && {}", value_match("?searchValue"));
        Ok(if request.searches_id() {
            pattern.filter(format!("{} || ({literal_match})", value_match(var)))
        } else {
            pattern.filter(literal_match)
        })
    }

    /// Locator for blank nodes adjacent to an IRI-identified vertex
    pub fn blank_nodes_near(&self, source: &VertexId) -> Result<String, CompileError> {
        let source = self.id_param(source.entity())?;
        Ok(SelectQuery::new(&["?bNode"])
            .distinct()
            .pattern(
                GroupPattern::new()
                    .union(vec![
                        GroupPattern::new().triple(&source, "?p", "?bNode"),
                        GroupPattern::new().triple("?bNode", "?p", &source),
                    ])
                    .filter("isBlank(?bNode)"),
            )
            .to_string())
    }

    /// Locator for blank nodes adjacent to blank nodes found by `parent`
    pub fn blank_nodes_near_template(&self, parent: &str) -> String {
        let parent_nodes = SelectQuery::new(&["(?bNode AS ?parent)"])
            .pattern(GroupPattern::new().embed(parent));

        SelectQuery::new(&["?bNode"])
            .distinct()
            .pattern(
                GroupPattern::new()
                    .subquery(&parent_nodes)
                    .union(vec![
                        GroupPattern::new().triple("?parent", "?p", "?bNode"),
                        GroupPattern::new().triple("?bNode", "?p", "?parent"),
                    ])
                    .filter("isBlank(?bNode)"),
            )
            .to_string()
    }

    /// Locator for blank nodes matched by a keyword search
    pub fn blank_nodes_matching(&self, request: &KeywordSearchRequest) -> Result<String, CompileError> {
        Ok(SelectQuery::new(&["?bNode"])
            .distinct()
            .pattern(
                self.keyword_selection(request, "?bNode")?
                    .filter("isBlank(?bNode)"),
            )
            .to_string())
    }

    /// One-hop query around every blank node located by `template`
    ///
    /// Projects `?bNode` next to the triples so rows can be attributed to a
    /// single blank node.
    pub fn blank_node_neighbors(&self, template: &str) -> String {
        let around = GroupPattern::new()
            .union(vec![
                GroupPattern::new().triple("?bNode", "?p", "?neighbor"),
                GroupPattern::new().triple("?neighbor", "?p", "?bNode"),
            ])
            .filter(format!("!isLiteral(?neighbor) && ?p != {TYPE}"))
            .triple("?neighbor", "?predicate", "?object")
            .filter(format!("?predicate = {TYPE} || isLiteral(?object)"))
            .bind("?neighbor", "?subject");

        SelectQuery::new(&["?bNode", "?subject", "?predicate", "?object"])
            .pattern(GroupPattern::new().embed(template).union(vec![
                GroupPattern::new()
                    .triple("?bNode", "?predicate", "?object")
                    .bind("?bNode", "?subject"),
                GroupPattern::new()
                    .triple("?subject", "?predicate", "?bNode")
                    .bind("?bNode", "?object"),
                around,
            ]))
            .to_string()
    }

    /// Instance counts per class
    pub fn class_counts(&self) -> String {
        SelectQuery::new(&["?class", "(COUNT(?subject) AS ?count)"])
            .pattern(GroupPattern::new().triple("?subject", TYPE, "?class"))
            .group_by(&["?class"])
            .to_string()
    }

    /// Literal predicates and a sample datatype for instances of one class
    pub fn class_predicates(&self, class: &str, sample_limit: usize) -> Result<String, CompileError> {
        let instances = SelectQuery::new(&["?subject"])
            .distinct()
            .pattern(GroupPattern::new().triple("?subject", TYPE, &iri(class)?))
            .paginate(sample_limit, 0);

        Ok(SelectQuery::new(&["?predicate", "(SAMPLE(DATATYPE(?value)) AS ?datatype)"])
            .pattern(
                GroupPattern::new()
                    .subquery(&instances)
                    .triple("?subject", "?predicate", "?value")
                    .filter("isLiteral(?value)"),
            )
            .group_by(&["?predicate"])
            .to_string())
    }

    /// Resource-valued predicate counts
    pub fn predicate_counts(&self) -> String {
        SelectQuery::new(&["?predicate", "(COUNT(*) AS ?count)"])
            .pattern(
                GroupPattern::new()
                    .triple("?subject", "?predicate", "?object")
                    .filter(format!("!isLiteral(?object) && ?predicate != {TYPE}")),
            )
            .group_by(&["?predicate"])
            .to_string()
    }

    /// Source/target class pairs of one predicate
    pub fn predicate_connections(&self, predicate: &str) -> Result<String, CompileError> {
        Ok(SelectQuery::new(&["?sourceClass", "?targetClass", "(COUNT(*) AS ?count)"])
            .pattern(
                GroupPattern::new()
                    .triple("?subject", &iri(predicate)?, "?object")
                    .triple("?subject", TYPE, "?sourceClass")
                    .triple("?object", TYPE, "?targetClass"),
            )
            .group_by(&["?sourceClass", "?targetClass"])
            .to_string())
    }
}

impl QueryCompiler for SparqlCompiler {
    fn name(&self) -> &str {
        "sparql"
    }

    fn neighbors(&self, request: &NeighborsRequest) -> Result<String, CompileError> {
        let source = self.source_term(request.vertex_id.as_ref())?;

        let selected = SelectQuery::new(&["?neighbor"])
            .distinct()
            .pattern(self.neighbor_selection(&source, request)?)
            .order_by(&["?neighbor"])
            .paginate(request.limit, request.offset);

        let edge_filter = Self::edge_filter("?predicate", request.edge_type_filter())?;
        let triples = neighbor_triples(&source, edge_filter);

        let mut pattern = GroupPattern::new().subquery(&selected);
        pattern.parts.extend(triples.parts);
        Ok(triples_query(pattern))
    }

    /// One row per class plus a row without `?class` holding the distinct
    /// neighbor total; untyped neighbors count as `rdfs:Resource`
    fn neighbor_counts(&self, request: &NeighborsCountRequest) -> Result<String, CompileError> {
        let source = self.source_term(request.vertex_id.as_ref())?;

        let neighbors = SelectQuery::new(&["?neighbor"])
            .distinct()
            .pattern(adjacency(&source, "?neighbor"))
            .paginate(request.limit.unwrap_or(0), 0);

        let per_class = SelectQuery::new(&["?class", "(COUNT(DISTINCT ?neighbor) AS ?count)"])
            .pattern(
                GroupPattern::new()
                    .subquery(&neighbors)
                    .optional(GroupPattern::new().triple("?neighbor", TYPE, "?type"))
                    .bind(&format!("COALESCE(?type, <{RDFS_RESOURCE}>)"), "?class"),
            )
            .group_by(&["?class"]);
        let total = SelectQuery::new(&["(COUNT(DISTINCT ?neighbor) AS ?count)"])
            .pattern(GroupPattern::new().subquery(&neighbors));

        Ok(SelectQuery::new(&["?class", "?count"])
            .pattern(GroupPattern::new().union(vec![
                GroupPattern::new().subquery(&per_class),
                GroupPattern::new().subquery(&total),
            ]))
            .to_string())
    }

    fn keyword_search(&self, request: &KeywordSearchRequest) -> Result<String, CompileError> {
        let selected = SelectQuery::new(&["?subject"])
            .distinct()
            .pattern(self.keyword_selection(request, "?subject")?)
            .order_by(&["?subject"])
            .paginate(request.limit, request.offset);

        Ok(triples_query(
            GroupPattern::new()
                .subquery(&selected)
                .triple("?subject", "?predicate", "?object")
                .filter(format!("?predicate = {TYPE} || isLiteral(?object)")),
        ))
    }

    fn vertex_details(&self, ids: &[VertexId]) -> Result<String, CompileError> {
        let terms = ids
            .iter()
            .map(|id| self.id_param(id.entity()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(triples_query(
            GroupPattern::new()
                .values("?subject", terms)
                .triple("?subject", "?predicate", "?object")
                .filter(format!("?predicate = {TYPE} || isLiteral(?object)")),
        ))
    }

    fn edge_details(&self, ids: &[EdgeId]) -> Result<String, CompileError> {
        let rows = ids
            .iter()
            .map(|id| -> Result<String, CompileError> {
                let edge = RdfEdgeId::try_from(id)?;
                Ok(format!(
                    "({} {} {})",
                    iri(&edge.source)?,
                    iri(&edge.predicate)?,
                    iri(&edge.target)?
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(triples_query(
            GroupPattern::new()
                .values("(?subject ?predicate ?object)", rows)
                .triple("?subject", "?predicate", "?object"),
        ))
    }

    fn vertex_count_by_type(&self, vertex_type: &str) -> Result<String, CompileError> {
        Ok(SelectQuery::new(&["(COUNT(DISTINCT ?subject) AS ?total)"])
            .pattern(
                GroupPattern::new()
                    .triple("?subject", TYPE, "?class")
                    .filter_if(Self::class_filter(&[vertex_type.to_string()])?),
            )
            .to_string())
    }
}
