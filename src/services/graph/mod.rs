//! Graph Store Layer
//!
//! [`GraphStore`] is the seam to the external graph database;
//! [`HttpGraphStore`] talks to Neo4j's HTTP transaction endpoint;
//! [`SimilarityIndex`] builds the parameterized similarity and recency
//! queries on top and maps rows to typed results.

pub mod http;
pub mod similarity;
pub mod store;

pub use http::{HttpGraphStore, Neo4jConfig};
pub use similarity::{CharacterRecord, DepartmentRecord, SimilarityFilter, SimilarityIndex};
pub use store::GraphStore;
