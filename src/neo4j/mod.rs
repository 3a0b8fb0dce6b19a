//! Neo4j backend for the knowledge graph (bolt, via `neo4rs`)

pub mod client;
mod impl_graph_store;

pub use client::Neo4jClient;
