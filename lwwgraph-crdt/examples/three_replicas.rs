//! Three replicas of a topology map drift apart while offline and are
//! then reconciled by exchanging their state in an arbitrary order.

use anyhow::Result;
use lwwgraph_crdt::{Graph, GraphState, Vertex};
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let node_a = Graph::new();
    let node_b = Graph::new();
    let node_c = Graph::new();

    node_a.add_vertex(Vertex::new("router-1", "10.0.0.1"))?;
    node_b.merge(&node_a);

    // Node A decommissions the router, node B wires a switch up to it.
    node_a.remove_vertex("router-1")?;
    node_b.add_vertex(Vertex::new("switch-1", "10.0.1.1"))?;
    node_b.add_edge("router-1", "switch-1")?;

    // Node C brings the router back later on.
    std::thread::sleep(std::time::Duration::from_millis(5));
    node_c.add_vertex(Vertex::new("router-1", "10.0.0.2"))?;

    // The state shipped around by whatever transport connects the replicas.
    let shipped: Vec<GraphState> = [&node_a, &node_b, &node_c]
        .iter()
        .map(|node| node.snapshot())
        .collect();

    for node in [&node_c, &node_b, &node_a] {
        for state in shipped.iter() {
            node.merge_state(state);
        }
    }

    for (name, node) in [("a", &node_a), ("b", &node_b), ("c", &node_c)] {
        for entry in node.list()? {
            info!(
                replica = name,
                vertex = %entry.vertex.key,
                value = %entry.vertex.value,
                adjacent = ?entry.adjacent_keys,
                "Converged vertex."
            );
        }
    }

    let path = node_a.find_path("router-1", "switch-1")?;
    info!(path = ?path.iter().map(|v| v.key.as_str()).collect::<Vec<_>>(), "Restored path.");

    Ok(())
}
