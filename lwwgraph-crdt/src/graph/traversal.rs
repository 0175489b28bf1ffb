use std::collections::{HashSet, VecDeque};
use std::vec;

use tracing::debug;

use super::GraphState;
use crate::element::Vertex;
use crate::error::GraphError;

/// A vertex on the current depth-first search path and the live
/// vertices adjacent to it which have not been explored yet.
struct Frame<'a> {
    vertex: &'a Vertex,
    pending: vec::IntoIter<&'a Vertex>,
}

impl GraphState {
    /// Finds every live vertex which is reachable from the vertex with the given key.
    ///
    /// Vertex V1 is considered connected to vertex Vn only when there is a
    /// directed path from V1 to Vn:
    /// * V1->V2->V3 - V1 is connected to V3
    /// * V1->V2<-V3 - V1 is not connected to V3
    ///
    /// The result is in breadth-first order and each vertex appears at most once.
    /// The start vertex is only included when it's reachable through a cycle.
    pub fn find_connected(&self, key: &str) -> Result<Vec<Vertex>, GraphError> {
        let start = self.lookup(key)?;

        let mut connected = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            for vertex in self.live_adjacent(current.key.as_str())? {
                if !visited.insert(vertex.key.as_str()) {
                    continue;
                }

                connected.push(vertex.clone());
                queue.push_back(vertex);
            }
        }

        debug!(key = %key, num_connected = connected.len(), "Found connected vertices.");

        Ok(connected)
    }

    /// Finds a path between the vertex `from` and the vertex `to`.
    ///
    /// The path always starts with the `from` vertex and ends with the `to`
    /// vertex. It's the first path found by a depth-first search, which is
    /// not necessarily the shortest one.
    ///
    /// A vertex only has a path to itself if it's part of a cycle, i.e. a
    /// vertex with an edge to itself produces the path `[v, v]`.
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<Vertex>, GraphError> {
        let start = self.lookup(from)?;
        self.lookup(to)?;

        let mut visited = HashSet::from([start.key.as_str()]);
        let mut stack = vec![Frame {
            vertex: start,
            pending: self.live_adjacent(start.key.as_str())?.into_iter(),
        }];

        while let Some(frame) = stack.last_mut() {
            let next = match frame.pending.next() {
                Some(next) => next,
                None => {
                    stack.pop();
                    continue;
                },
            };

            if next.key == to {
                let mut path: Vec<Vertex> =
                    stack.iter().map(|frame| frame.vertex.clone()).collect();
                path.push(next.clone());

                debug!(from = %from, to = %to, length = path.len(), "Found path.");
                return Ok(path);
            }

            if !visited.insert(next.key.as_str()) {
                continue;
            }

            let pending = self.live_adjacent(next.key.as_str())?.into_iter();
            stack.push(Frame {
                vertex: next,
                pending,
            });
        }

        Err(GraphError::PathNotFound {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
