//! # LWW Graph CRDT
//!
//! An implementation of the Last-Writer-Wins element set CRDT, and a directed graph
//! composed from these sets which can be mutated independently on many replicas and
//! later merged without coordination, always converging to the same state.
//!
//! Conflicts are resolved purely by comparing the [Timestamp]s handed out by each
//! replica's [Clock]. Causality is not tracked, it is only approximated by time.
//!
//! The crate only defines the replicated state and its merge function, shipping the
//! state between replicas is left to the caller. With the `rkyv-support` feature
//! enabled [ElementSet] and [GraphState] can be (de)serialized with `rkyv`.
//!
//! ### Basic Example
//! ```rust
//! use std::sync::Arc;
//! use lwwgraph_crdt::{Graph, ManualClock, Vertex, VertexWithEdges};
//!
//! // Sharing a clock gives every event a unique, ordered timestamp.
//! let clock = Arc::new(ManualClock::new(0));
//!
//! let node_a = Graph::with_clock(clock.clone());
//! let node_b = Graph::with_clock(clock.clone());
//! let node_c = Graph::with_clock(clock);
//!
//! let v1 = Vertex::new("v1", "value1");
//! let v2 = Vertex::new("v2", "value2");
//!
//! node_a.add_vertex(v1.clone()).unwrap();
//! node_b.merge(&node_a);
//!
//! // Node A removes v1, while node B adds v2 and an edge from v1.
//! node_a.remove_vertex("v1").unwrap();
//! node_b.add_vertex(v2.clone()).unwrap();
//! node_b.add_edge("v1", "v2").unwrap();
//!
//! // Node C independently adds v1 later on.
//! node_c.add_vertex(v1.clone()).unwrap();
//!
//! for _ in 0..2 {
//!     node_a.merge(&node_b);
//!     node_a.merge(&node_c);
//!     node_b.merge(&node_a);
//!     node_c.merge(&node_a);
//! }
//!
//! let expected = vec![
//!     VertexWithEdges { vertex: v1, adjacent_keys: vec!["v2".to_string()] },
//!     VertexWithEdges { vertex: v2, adjacent_keys: vec![] },
//! ];
//! assert_eq!(node_a.list().unwrap(), expected);
//! assert_eq!(node_b.list().unwrap(), expected);
//! assert_eq!(node_c.list().unwrap(), expected);
//! ```

mod clock;
mod element;
mod error;
mod graph;
mod set;
mod timestamp;

pub use clock::{Clock, HybridClock, ManualClock};
pub use element::{Element, KeyElement, Keyed, Vertex};
#[cfg(feature = "rkyv-support")]
pub use error::BadState;
pub use error::{ElementNotFound, GraphError};
pub use graph::{Graph, GraphState, VertexWithEdges};
pub use set::{AddRecord, ElementSet, Set, StateChanges};
pub use timestamp::{get_unix_timestamp_ms, InvalidFormat, Timestamp};
