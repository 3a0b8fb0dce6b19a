//! Backend-neutral knowledge graph interface.
//!
//! ## Modules
//!
//! - [`models`] - Labels, edge types, property values, selectors, stats
//! - [`traits`] - `GraphStore`, the capability interface every backend implements
//! - [`cypher`] - Statement builders shared by the Cypher-speaking backends
//! - [`mock`] - `MockGraphStore` for testing (cfg(test) only)

pub mod cypher;
pub mod models;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

pub use models::*;
pub use traits::GraphStore;
