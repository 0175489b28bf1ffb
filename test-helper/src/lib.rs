use std::ptr;
use std::sync::Arc;

use lwwgraph_crdt::{Clock, Graph, ManualClock, Set, Vertex};

/// A deterministic clock to be shared by every replica within a test.
pub fn shared_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(0))
}

/// Creates `n` vertices keyed `vertex1..=vertexN` with the values `value1..=valueN`.
pub fn vertices(n: usize) -> Vec<Vertex> {
    (1..=n)
        .map(|i| Vertex::new(format!("vertex{i}"), format!("value{i}")))
        .collect()
}

/// Merges every graph into every other graph.
pub fn replicate_graphs<C: Clock>(graphs: &[&Graph<C>]) {
    for to in graphs {
        for from in graphs {
            if ptr::eq(*to, *from) {
                continue;
            }

            to.merge(*from);
        }
    }
}

/// Merges every set into every other set.
pub fn replicate_sets<C: Clock>(sets: &[&Set<C>]) {
    for to in sets {
        for from in sets {
            if ptr::eq(*to, *from) {
                continue;
            }

            to.merge(*from);
        }
    }
}

/// Asserts every graph produces the same export as the first graph.
pub fn assert_converged<C: Clock>(graphs: &[&Graph<C>]) {
    assert!(graphs.len() > 1, "2 and more graphs can be compared");

    let expected = graphs[0].list().expect("List first graph");
    for (i, graph) in graphs.iter().enumerate().skip(1) {
        let list = graph.list().expect("List graph");
        assert_eq!(expected, list, "Graph {i} has not converged with graph 0.");
    }
}

/// Sorts a list of keyed values by their key.
pub fn sorted_by_key<T, K: Ord>(mut values: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    values.sort_by_key(key);
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replicate_graphs() {
        let clock = shared_clock();
        let node_a = Graph::with_clock(clock.clone());
        let node_b = Graph::with_clock(clock);

        let fixtures = vertices(2);
        node_a.add_vertex(fixtures[0].clone()).expect("Add vertex");
        node_b.add_vertex(fixtures[1].clone()).expect("Add vertex");

        replicate_graphs(&[&node_a, &node_b]);
        assert_converged(&[&node_a, &node_b]);
        assert_eq!(node_a.list().expect("List graph").len(), 2);
    }
}
