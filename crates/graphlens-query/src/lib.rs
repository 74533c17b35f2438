//! Query compilers for graphlens
//!
//! Each compiler turns the backend-agnostic requests from `graphlens-core`
//! into one query-language string:
//!
//! ```text
//! NeighborsRequest ─┬─> GremlinCompiler    ─> g.V("1").both()...
//!                   ├─> OpenCypherCompiler ─> MATCH (v)-[e]-(tgt) ...
//!                   └─> SparqlCompiler     ─> SELECT ?subject ?predicate ?object ...
//! ```
//!
//! Compilation is pure and deterministic: structurally identical requests
//! produce byte-identical queries, which the request cache relies on.
//! Callers are expected to short-circuit empty id/type collections before
//! compiling.

pub mod error;
pub mod literal;
pub mod render;

pub use error::CompileError;
pub use render::gremlin::GremlinCompiler;
pub use render::opencypher::OpenCypherCompiler;
pub use render::sparql::{SparqlCompiler, RDF_TYPE, RDFS_RESOURCE};
pub use render::QueryCompiler;
