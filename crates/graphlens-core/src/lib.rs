//! Backend-agnostic model shared by every graphlens connector.
//!
//! - [`model`]: vertices, edges, scalars and bundles produced by mappers
//! - [`id`]: opaque vertex/edge identifiers and the RDF synthetic edge id
//! - [`criterion`]: attribute filters and their client-side evaluation
//! - [`request`]: request/response types of the connector operations
//! - [`transport`]: the injected "query string in, JSON out" seam
//! - [`cache`]: TTL request cache keyed by compiled query text
//! - [`batch`]: windowed runner for fan-out queries

pub mod batch;
pub mod cache;
pub mod criterion;
pub mod id;
pub mod model;
pub mod request;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use batch::BatchRunner;
pub use cache::RequestCache;
pub use criterion::{AttributeDataType, Criterion, Operator};
pub use id::{EdgeId, EntityId, IdentityError, RdfEdgeId, VertexId};
pub use model::{
    Bundle, Edge, EntityCollector, EntityProperties, EntityValue, MappedQueryResults, Scalar,
    Vertex,
};
pub use request::{
    AttributeConfig, CountsByTypeRequest, CountsByTypeResponse, EdgeConnection,
    EdgeConnectionsRequest, EdgeDetailsRequest, EdgeDetailsResponse, EdgeTypeConfig,
    KeywordSearchRequest, KeywordSearchResponse, NeighborsCountRequest, NeighborsCountResponse,
    NeighborsRequest, NeighborsResponse, RawQueryRequest, RawQueryResponse, SchemaResponse,
    VertexDetailsRequest, VertexDetailsResponse, VertexTypeConfig, ID_SEARCH_ATTRIBUTE,
};
pub use transport::{QueryTransport, TransportError};

pub use graphlens_config::{IdType, QueryEngine};
pub use tokio_util::sync::CancellationToken;
