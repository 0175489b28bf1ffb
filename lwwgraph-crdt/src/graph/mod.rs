mod traversal;

use std::collections::BTreeMap;

#[cfg(feature = "rkyv-support")]
use bytecheck::CheckBytes;
use parking_lot::Mutex;
#[cfg(feature = "rkyv-support")]
use rkyv::{Archive, Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clock::{Clock, HybridClock};
use crate::element::{Element, KeyElement, Keyed, Vertex};
#[cfg(feature = "rkyv-support")]
use crate::error::BadState;
use crate::error::GraphError;
use crate::set::ElementSet;
use crate::timestamp::Timestamp;

/// A flat, comparable export of a single live vertex.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexWithEdges {
    pub vertex: Vertex,
    /// The keys of every vertex this vertex has an edge to, sorted.
    ///
    /// This includes edges pointing at vertices which are not currently live.
    pub adjacent_keys: Vec<String>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "rkyv-support", derive(Serialize, Deserialize, Archive))]
#[cfg_attr(feature = "rkyv-support", archive_attr(derive(CheckBytes, Debug)))]
/// The replicated state of a Last-Writer-Wins directed graph.
///
/// The graph is composed of two dimensions of [ElementSet]s:
/// * a set of all the vertices.
/// * a set of adjacent vertex keys per vertex key, one per source of an edge.
///
/// Removing a vertex never touches its edges. An edge may therefore point
/// from or to a vertex which is no longer live, such hanging edges are
/// skipped by every traversal but are kept, so that the edges come back
/// once the vertex is re-added on any replica.
///
/// Consider the following scenario:
/// 1. A adds vertex V1
/// 2. B and A replicate
/// 3. B adds vertex V2 and edge (V1, V2)
/// 4. A removes V1
/// 5. C adds vertex V1
/// 6. B and A replicate: V1 gets removed from B, the edge V1->V2 is kept
/// 7. C and B replicate, V1 is re-added to B and the edge V1->V2 is live again
/// 8. A and B (or C) replicate: every replica holds V1, V2 and the edge V1->V2
///
/// ```text
/// Time ->
/// A--AddVertex(V1)-\-RemoveVertex(V1)---------------\----\-|
/// B-----------------\-AddVertex(V2),AddEdge(V1, V2)--\-\--\|=> A,B,C = {V1->V2}
/// C---------------------------AddVertex(V1)-------------\--|
/// ```
pub struct GraphState {
    vertices: ElementSet,
    edges: BTreeMap<String, ElementSet>,
}

impl GraphState {
    #[cfg(feature = "rkyv-support")]
    /// Deserializes a [GraphState] from a array of bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, BadState> {
        rkyv::from_bytes::<Self>(data).map_err(|_| BadState)
    }

    #[cfg(feature = "rkyv-support")]
    /// Serializes the graph into a buffer of bytes.
    pub fn as_bytes(&self) -> Result<Vec<u8>, BadState> {
        Ok(rkyv::to_bytes::<_, 4096>(self)
            .map_err(|_| BadState)?
            .into_vec())
    }

    /// The set of vertices, including the registers of removed vertices.
    pub fn vertices(&self) -> &ElementSet {
        &self.vertices
    }

    /// The set of adjacent vertex keys for the given vertex key.
    ///
    /// Returns `None` if no edge has ever been recorded for the key.
    pub fn adjacent(&self, key: &str) -> Option<&ElementSet> {
        self.edges.get(key)
    }

    /// The latest timestamp held by any vertex or edge register.
    pub fn latest(&self) -> Option<Timestamp> {
        let edges = self.edges.values().filter_map(ElementSet::latest);
        self.vertices.latest().into_iter().chain(edges).max()
    }

    /// Adds the vertex to the graph at the given timestamp.
    pub fn add_vertex_at(&mut self, vertex: Vertex, ts: Timestamp) -> Result<(), GraphError> {
        match self.lookup(vertex.key()) {
            Ok(_) => return Err(GraphError::VertexAlreadyExists(vertex.key)),
            Err(GraphError::VertexNotFound(_)) => {},
            Err(e) => return Err(e),
        }

        self.vertices.add_at(vertex, ts);
        Ok(())
    }

    /// Removes the vertex with the given key at the given timestamp.
    ///
    /// The edges of the vertex are left untouched.
    pub fn remove_vertex_at(&mut self, key: &str, ts: Timestamp) -> Result<(), GraphError> {
        self.lookup(key)?;
        self.vertices.remove_at(key, ts);
        Ok(())
    }

    /// Adds a directed edge between two live vertices at the given timestamp.
    pub fn add_edge_at(&mut self, from: &str, to: &str, ts: Timestamp) -> Result<(), GraphError> {
        self.lookup(from)?;
        self.lookup(to)?;

        self.adjacent_mut(from).add_at(KeyElement::new(to), ts);
        Ok(())
    }

    /// Removes a directed edge between two live vertices at the given timestamp.
    pub fn remove_edge_at(
        &mut self,
        from: &str,
        to: &str,
        ts: Timestamp,
    ) -> Result<(), GraphError> {
        self.lookup(from)?;
        self.lookup(to)?;

        self.adjacent_mut(from).remove_at(to, ts);
        Ok(())
    }

    /// Get the vertex with the given key if it's currently part of the graph.
    pub fn lookup(&self, key: &str) -> Result<&Vertex, GraphError> {
        let element = self
            .vertices
            .lookup(key)
            .map_err(|_| GraphError::VertexNotFound(key.to_string()))?;

        match element {
            Element::Vertex(vertex) => Ok(vertex),
            Element::Key(_) => Err(GraphError::InvalidVertexType(key.to_string())),
        }
    }

    /// Produces a deterministic export of the graph.
    ///
    /// Vertices are sorted by key and every vertex carries the sorted keys
    /// of its adjacent vertices, including any hanging edges.
    pub fn list(&self) -> Result<Vec<VertexWithEdges>, GraphError> {
        let mut list = Vec::new();

        for element in self.vertices.iter() {
            let vertex = element
                .as_vertex()
                .ok_or_else(|| GraphError::InvalidVertexType(element.key().to_string()))?;

            let mut adjacent_keys: Vec<String> = self
                .adjacent(vertex.key())
                .map(|adjacent| adjacent.keys().map(String::from).collect())
                .unwrap_or_default();
            adjacent_keys.sort();

            list.push(VertexWithEdges {
                vertex: vertex.clone(),
                adjacent_keys,
            });
        }

        list.sort_by(|a, b| a.vertex.key.cmp(&b.vertex.key));

        Ok(list)
    }

    /// Merges another graph into the current graph.
    ///
    /// The vertex sets are merged, followed by every adjacency set known to
    /// `other`. Edges are not validated against the liveness of their vertices.
    ///
    /// Returns the number of registers which have been adopted from `other`.
    pub fn merge(&mut self, other: &GraphState) -> usize {
        let mut adopted = self.vertices.merge(&other.vertices);

        for (key, remote_adjacent) in other.edges.iter() {
            adopted += self.adjacent_mut(key).merge(remote_adjacent);
        }

        if adopted > 0 {
            debug!(
                adopted = adopted,
                num_adjacency_sets = other.edges.len(),
                "Merged remote graph."
            );
        }

        adopted
    }

    /// The adjacency set for the given key, created on first use.
    fn adjacent_mut(&mut self, key: &str) -> &mut ElementSet {
        self.edges.entry(key.to_string()).or_insert_with(|| {
            trace!(key = %key, "Creating adjacency set.");
            ElementSet::default()
        })
    }

    /// The live vertices the given vertex has an edge to.
    ///
    /// Edges pointing at vertices which are not live are skipped.
    fn live_adjacent(&self, key: &str) -> Result<Vec<&Vertex>, GraphError> {
        let adjacent = match self.edges.get(key) {
            Some(adjacent) => adjacent,
            None => return Ok(Vec::new()),
        };

        let mut live = Vec::new();
        for target in adjacent.keys() {
            match self.lookup(target) {
                Ok(vertex) => live.push(vertex),
                Err(GraphError::VertexNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(live)
    }
}

#[derive(Debug)]
/// A replica of a Last-Writer-Wins directed graph.
///
/// The replica timestamps its own events using its [Clock] and holds its
/// lock for the full duration of every operation, including traversals.
/// Long running traversals on large graphs will therefore block writers.
///
/// ## Example
/// ```
/// use lwwgraph_crdt::{Graph, Vertex};
///
/// let node_a = Graph::new();
/// let node_b = Graph::new();
///
/// node_a.add_vertex(Vertex::new("v1", "value1")).unwrap();
/// node_b.add_vertex(Vertex::new("v2", "value2")).unwrap();
///
/// node_a.merge(&node_b);
/// node_a.add_edge("v1", "v2").unwrap();
/// node_b.merge(&node_a);
///
/// let path = node_b.find_path("v1", "v2").unwrap();
/// assert_eq!(path.len(), 2);
/// assert_eq!(node_a.list().unwrap(), node_b.list().unwrap());
/// ```
pub struct Graph<C: Clock = HybridClock> {
    state: Mutex<GraphState>,
    clock: C,
}

impl Graph<HybridClock> {
    /// Creates a new empty graph using the system backed [HybridClock].
    pub fn new() -> Self {
        Self::with_clock(HybridClock::new())
    }
}

impl Default for Graph<HybridClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Graph<C> {
    /// Creates a new empty graph which reads its timestamps from the given clock.
    pub fn with_clock(clock: C) -> Self {
        Self::from_state(GraphState::default(), clock)
    }

    /// Creates a graph from some existing replicated state.
    pub fn from_state(state: GraphState, clock: C) -> Self {
        Self {
            state: Mutex::new(state),
            clock,
        }
    }

    /// Adds the vertex to the graph.
    ///
    /// Returns [GraphError::VertexAlreadyExists] if a vertex with the same
    /// key is already live.
    pub fn add_vertex(&self, vertex: Vertex) -> Result<(), GraphError> {
        let mut state = self.state.lock();
        state.add_vertex_at(vertex, self.clock.now())
    }

    /// Removes the vertex with the given key, keeping its edges.
    pub fn remove_vertex(&self, key: &str) -> Result<(), GraphError> {
        let mut state = self.state.lock();
        state.remove_vertex_at(key, self.clock.now())
    }

    /// Adds a directed edge from the vertex `from` to the vertex `to`.
    ///
    /// Both vertices must currently be live.
    pub fn add_edge(&self, from: &str, to: &str) -> Result<(), GraphError> {
        let mut state = self.state.lock();
        state.add_edge_at(from, to, self.clock.now())
    }

    /// Removes the directed edge from the vertex `from` to the vertex `to`.
    ///
    /// Both vertices must currently be live.
    pub fn remove_edge(&self, from: &str, to: &str) -> Result<(), GraphError> {
        let mut state = self.state.lock();
        state.remove_edge_at(from, to, self.clock.now())
    }

    pub fn lookup(&self, key: &str) -> Result<Vertex, GraphError> {
        self.state.lock().lookup(key).cloned()
    }

    /// Finds every live vertex reachable from the vertex with the given key.
    ///
    /// See [GraphState::find_connected].
    pub fn find_connected(&self, key: &str) -> Result<Vec<Vertex>, GraphError> {
        self.state.lock().find_connected(key)
    }

    /// Finds a path of live vertices between two vertices.
    ///
    /// See [GraphState::find_path].
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<Vertex>, GraphError> {
        self.state.lock().find_path(from, to)
    }

    /// Produces a deterministic export of the graph.
    ///
    /// See [GraphState::list].
    pub fn list(&self) -> Result<Vec<VertexWithEdges>, GraphError> {
        self.state.lock().list()
    }

    /// Takes a copy of the replicated state of the graph.
    pub fn snapshot(&self) -> GraphState {
        self.state.lock().clone()
    }

    /// Merges the state of another replica into this one.
    ///
    /// The remote replica is snapshotted first and its lock released before
    /// this replica is locked, two replicas merging from one another at the
    /// same time cannot deadlock.
    pub fn merge<O: Clock>(&self, remote: &Graph<O>) {
        let remote = remote.snapshot();
        self.merge_state(&remote);
    }

    /// Merges some replicated state, i.e. received from another node.
    ///
    /// The clock observes the latest remote timestamp, so local events
    /// recorded after the merge are always ordered after the merged ones.
    pub fn merge_state(&self, remote: &GraphState) {
        let mut state = self.state.lock();
        state.merge(remote);

        if let Some(latest) = remote.latest() {
            self.clock.observe(latest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn graph() -> Graph<ManualClock> {
        Graph::with_clock(ManualClock::new(0))
    }

    #[test]
    fn test_vertex_lookup() {
        let graph = graph();
        let v1 = Vertex::new("vertex1", "value1");

        graph.add_vertex(v1.clone()).expect("Add vertex");
        assert_eq!(graph.lookup("vertex1"), Ok(v1));
        assert_eq!(
            graph.lookup("vertex2"),
            Err(GraphError::VertexNotFound("vertex2".to_string()))
        );
    }

    #[test]
    fn test_add_vertex_twice() {
        let graph = graph();
        let v1 = Vertex::new("vertex1", "value1");

        graph.add_vertex(v1.clone()).expect("Add vertex");
        assert_eq!(
            graph.add_vertex(v1),
            Err(GraphError::VertexAlreadyExists("vertex1".to_string()))
        );
    }

    #[test]
    fn test_remove_vertex() {
        let graph = graph();

        assert_eq!(
            graph.remove_vertex("vertex1"),
            Err(GraphError::VertexNotFound("vertex1".to_string())),
            "Removing an unknown vertex should fail."
        );

        graph
            .add_vertex(Vertex::new("vertex1", "value1"))
            .expect("Add vertex");
        graph.remove_vertex("vertex1").expect("Remove vertex");

        assert!(graph.lookup("vertex1").is_err());
        assert_eq!(
            graph.remove_vertex("vertex1"),
            Err(GraphError::VertexNotFound("vertex1".to_string())),
            "Removing a removed vertex should fail."
        );

        graph
            .add_vertex(Vertex::new("vertex1", "value2"))
            .expect("Re-add vertex");
        assert_eq!(graph.lookup("vertex1"), Ok(Vertex::new("vertex1", "value2")));
    }

    #[test]
    fn test_edge_requires_live_vertices() {
        let graph = graph();
        graph.add_vertex(Vertex::new("v1", "")).expect("Add vertex");

        assert_eq!(
            graph.add_edge("v1", "v2"),
            Err(GraphError::VertexNotFound("v2".to_string()))
        );
        assert_eq!(
            graph.add_edge("v2", "v1"),
            Err(GraphError::VertexNotFound("v2".to_string()))
        );
        assert_eq!(
            graph.remove_edge("v1", "v2"),
            Err(GraphError::VertexNotFound("v2".to_string()))
        );

        assert!(
            graph.snapshot().adjacent("v2").is_none(),
            "A failed edge operation should not create an adjacency set."
        );
    }

    #[test]
    fn test_remove_vertex_keeps_edges() {
        let graph = graph();
        graph.add_vertex(Vertex::new("v1", "")).expect("Add vertex");
        graph.add_vertex(Vertex::new("v2", "")).expect("Add vertex");
        graph.add_edge("v1", "v2").expect("Add edge");

        graph.remove_vertex("v1").expect("Remove vertex");
        assert_eq!(graph.list().expect("List graph").len(), 1);

        graph.add_vertex(Vertex::new("v1", "back")).expect("Re-add vertex");
        let list = graph.list().expect("List graph");
        assert_eq!(
            list[0],
            VertexWithEdges {
                vertex: Vertex::new("v1", "back"),
                adjacent_keys: vec!["v2".to_string()],
            },
            "Re-added vertex should have its edges restored."
        );
    }

    #[test]
    fn test_remove_edge() {
        let graph = graph();
        graph.add_vertex(Vertex::new("v1", "")).expect("Add vertex");
        graph.add_vertex(Vertex::new("v2", "")).expect("Add vertex");

        graph.add_edge("v1", "v2").expect("Add edge");
        graph.remove_edge("v1", "v2").expect("Remove edge");
        graph.remove_edge("v1", "v2").expect("Remove edge twice");

        let list = graph.list().expect("List graph");
        assert!(list[0].adjacent_keys.is_empty(), "Expected edge to be removed.");
    }

    #[test]
    fn test_list_is_sorted() {
        let graph = graph();
        for key in ["c", "a", "b"] {
            graph.add_vertex(Vertex::new(key, key)).expect("Add vertex");
        }
        graph.add_edge("a", "c").expect("Add edge");
        graph.add_edge("a", "b").expect("Add edge");

        let list = graph.list().expect("List graph");
        let keys: Vec<&str> = list.iter().map(|v| v.vertex.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(list[0].adjacent_keys, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_invalid_vertex_type() {
        let mut state = GraphState::default();
        state.vertices.add_at("broken", Timestamp::new(1, 0));

        assert_eq!(
            state.lookup("broken"),
            Err(GraphError::InvalidVertexType("broken".to_string()))
        );
        assert_eq!(
            state.add_vertex_at(Vertex::new("broken", ""), Timestamp::new(2, 0)),
            Err(GraphError::InvalidVertexType("broken".to_string()))
        );
        assert!(state.list().is_err());
    }

    #[test]
    fn test_merge_creates_adjacency_sets() {
        let mut node_a = GraphState::default();
        let mut node_b = GraphState::default();

        node_b
            .add_vertex_at(Vertex::new("v1", ""), Timestamp::new(1, 0))
            .expect("Add vertex");
        node_b
            .add_vertex_at(Vertex::new("v2", ""), Timestamp::new(2, 0))
            .expect("Add vertex");
        node_b
            .add_edge_at("v1", "v2", Timestamp::new(3, 0))
            .expect("Add edge");

        let adopted = node_a.merge(&node_b);
        assert_eq!(adopted, 3);
        assert!(node_a.adjacent("v1").is_some());
        assert_eq!(node_a, node_b);

        assert_eq!(node_a.merge(&node_b), 0, "Merging twice should be a no-op.");
    }
}
