use thiserror::Error;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("Element {0:?} was not found in the set.")]
/// The element is either unknown or has been removed from the set.
pub struct ElementNotFound(pub String);

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum GraphError {
    #[error("Vertex {0:?} already exists in the graph.")]
    /// A live vertex with the same key is already part of the graph.
    VertexAlreadyExists(String),

    #[error("Vertex {0:?} was not found in the graph.")]
    /// The vertex is either unknown or has been removed from the graph.
    VertexNotFound(String),

    #[error("No path exists from vertex {from:?} to vertex {to:?}.")]
    PathNotFound { from: String, to: String },

    #[error("Element {0:?} within the vertex set is not a vertex.")]
    /// The vertex set holds a key-only element, which indicates the
    /// replicated state has been corrupted.
    InvalidVertexType(String),
}

#[cfg(feature = "rkyv-support")]
#[derive(Debug, thiserror::Error)]
#[error("The state cannot be (de)serialized from the provided set of bytes.")]
pub struct BadState;
