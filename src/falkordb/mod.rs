//! FalkorDB backend for the knowledge graph (RESP `GRAPH.QUERY`, via `redis`)

pub mod client;
mod impl_graph_store;
mod reply;

pub use client::FalkorClient;
