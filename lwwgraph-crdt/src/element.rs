#[cfg(feature = "rkyv-support")]
use bytecheck::CheckBytes;
#[cfg(feature = "rkyv-support")]
use rkyv::{Archive, Deserialize, Serialize};

/// A value which can be identified by a stable, globally unique key.
///
/// Two elements with the same key are considered to be the same
/// element across every replica, for example a UUID.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// A graph vertex, a unique key carrying an opaque payload.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "rkyv-support", derive(Serialize, Deserialize, Archive))]
#[cfg_attr(feature = "rkyv-support", archive(compare(PartialEq)))]
#[cfg_attr(feature = "rkyv-support", archive_attr(derive(CheckBytes, Debug)))]
pub struct Vertex {
    pub key: String,
    pub value: String,
}

impl Vertex {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Keyed for Vertex {
    fn key(&self) -> &str {
        &self.key
    }
}

/// An element which carries nothing but its key.
///
/// Used as the target of an edge within an adjacency set.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "rkyv-support", derive(Serialize, Deserialize, Archive))]
#[cfg_attr(feature = "rkyv-support", archive(compare(PartialEq)))]
#[cfg_attr(feature = "rkyv-support", archive_attr(derive(CheckBytes, Debug)))]
pub struct KeyElement(pub String);

impl KeyElement {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl Keyed for KeyElement {
    fn key(&self) -> &str {
        &self.0
    }
}

/// Any value which can be stored within an [ElementSet](crate::ElementSet).
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "rkyv-support", derive(Serialize, Deserialize, Archive))]
#[cfg_attr(feature = "rkyv-support", archive(compare(PartialEq)))]
#[cfg_attr(feature = "rkyv-support", archive_attr(derive(CheckBytes, Debug)))]
pub enum Element {
    Vertex(Vertex),
    Key(KeyElement),
}

impl Element {
    /// Returns the vertex if this element is one.
    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Element::Vertex(vertex) => Some(vertex),
            Element::Key(_) => None,
        }
    }
}

impl Keyed for Element {
    fn key(&self) -> &str {
        match self {
            Element::Vertex(vertex) => vertex.key(),
            Element::Key(element) => element.key(),
        }
    }
}

impl From<Vertex> for Element {
    fn from(vertex: Vertex) -> Self {
        Self::Vertex(vertex)
    }
}

impl From<KeyElement> for Element {
    fn from(element: KeyElement) -> Self {
        Self::Key(element)
    }
}

impl From<&str> for Element {
    fn from(key: &str) -> Self {
        Self::Key(KeyElement::new(key))
    }
}

impl From<String> for Element {
    fn from(key: String) -> Self {
        Self::Key(KeyElement(key))
    }
}
