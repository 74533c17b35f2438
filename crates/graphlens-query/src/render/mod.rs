//! Per-language compilers.
//!
//! Every compiler owns one `id_param` function, its criterion translation
//! table and a small clause builder that does all escaping; the public
//! operations only assemble clauses.

pub mod gremlin;
pub mod opencypher;
pub mod sparql;

use crate::error::CompileError;
use graphlens_core::{
    EdgeId, KeywordSearchRequest, NeighborsCountRequest, NeighborsRequest, VertexId,
};

/// Operations every backend can compile
///
/// Schema discovery differs structurally between property graphs and RDF,
/// so those queries live on the concrete compilers.
pub trait QueryCompiler: Send + Sync {
    /// Backend name used in logs
    fn name(&self) -> &str;

    /// One-hop neighbors with their connecting edges
    fn neighbors(&self, request: &NeighborsRequest) -> Result<String, CompileError>;

    /// Neighbor counts grouped by type
    fn neighbor_counts(&self, request: &NeighborsCountRequest) -> Result<String, CompileError>;

    fn keyword_search(&self, request: &KeywordSearchRequest) -> Result<String, CompileError>;

    fn vertex_details(&self, ids: &[VertexId]) -> Result<String, CompileError>;

    fn edge_details(&self, ids: &[EdgeId]) -> Result<String, CompileError>;

    /// Total instances of a possibly compound type
    fn vertex_count_by_type(&self, vertex_type: &str) -> Result<String, CompileError>;
}

/// `LIMIT`/`OFFSET` pair following the shared pagination rule
///
/// Zero limit is unlimited; an offset is only meaningful with a limit.
pub(crate) fn page(limit: usize, offset: usize) -> (Option<usize>, Option<usize>) {
    match (limit, offset) {
        (0, _) => (None, None),
        (l, 0) => (Some(l), None),
        (l, o) => (Some(l), Some(o)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockCompiler;

    impl QueryCompiler for MockCompiler {
        fn name(&self) -> &str {
            "mock"
        }

        fn neighbors(&self, request: &NeighborsRequest) -> Result<String, CompileError> {
            Ok(format!("neighbors {:?}", request.vertex_id))
        }

        fn neighbor_counts(&self, _: &NeighborsCountRequest) -> Result<String, CompileError> {
            Ok("counts".to_string())
        }

        fn keyword_search(&self, _: &KeywordSearchRequest) -> Result<String, CompileError> {
            Ok("search".to_string())
        }

        fn vertex_details(&self, ids: &[VertexId]) -> Result<String, CompileError> {
            Ok(format!("vertices {}", ids.len()))
        }

        fn edge_details(&self, ids: &[EdgeId]) -> Result<String, CompileError> {
            Ok(format!("edges {}", ids.len()))
        }

        fn vertex_count_by_type(&self, vertex_type: &str) -> Result<String, CompileError> {
            Ok(format!("count {vertex_type}"))
        }
    }

    #[test]
    fn test_compiler_trait_object() {
        let compiler: Box<dyn QueryCompiler> = Box::new(MockCompiler);
        assert_eq!(compiler.name(), "mock");
        assert_eq!(compiler.vertex_count_by_type("a").unwrap(), "count a");
    }

    #[test]
    fn test_page_rules() {
        assert_eq!(page(0, 5), (None, None));
        assert_eq!(page(10, 0), (Some(10), None));
        assert_eq!(page(10, 5), (Some(10), Some(5)));
    }
}
