#![cfg(feature = "rkyv-support")]

use anyhow::Result;
use lwwgraph_crdt::{ElementSet, Graph, GraphState, Timestamp};
use test_helper::{shared_clock, vertices};

#[test]
fn test_graph_state_bytes() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let v = vertices(3);
    let graph = Graph::with_clock(shared_clock());
    for vertex in v.iter() {
        graph.add_vertex(vertex.clone())?;
    }
    graph.add_edge(&v[0].key, &v[1].key)?;
    graph.add_edge(&v[1].key, &v[2].key)?;
    graph.remove_vertex(&v[1].key)?;

    let state = graph.snapshot();
    let bytes = state.as_bytes()?;
    let decoded = GraphState::from_bytes(&bytes)?;
    assert_eq!(decoded, state);

    // A replica can be built straight from the shipped state.
    let replica = Graph::with_clock(shared_clock());
    replica.merge_state(&decoded);
    assert_eq!(replica.list()?, graph.list()?);

    Ok(())
}

#[test]
fn test_bad_state() {
    assert!(ElementSet::from_bytes(b"not a set").is_err());

    let mut set = ElementSet::default();
    set.add_at("e1", Timestamp::new(1, 0));
    set.remove_at("e2", Timestamp::new(2, 0));
    let bytes = set.as_bytes().expect("Serialize set");
    assert_eq!(ElementSet::from_bytes(&bytes).expect("Deserialize set"), set);
}
