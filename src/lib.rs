//! # LWW Graph
//! Conflict free replicated data types for building eventually consistent applications.
//!
//! This is a convenience package which re-exports the sub-projects of the workspace:
//!
//! ### Features
//! - `lwwgraph-crdt` - A Last-Writer-Wins element set and a directed graph built from it.
//! - `rkyv` - Enables zero-copy (de)serialization of the replicated state.

#[cfg(feature = "lwwgraph-crdt")]
pub use lwwgraph_crdt as crdt;
