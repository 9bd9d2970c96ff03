use std::fmt;

use crate::types::VertexId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The vertex is already a member of the graph.
    VertexDuplicate(VertexId),

    /// The vertex is not a member of the graph, or its handle is stale.
    VertexNotFound(VertexId),

    /// An edge already connects the unordered pair, in either direction.
    EdgeAlreadyExists(VertexId, VertexId),

    /// Both endpoints of the requested edge are the same vertex.
    EdgeSelfLoop(VertexId),

    /// No edge connects the unordered pair.
    EdgeNotFound(VertexId, VertexId),

    /// The reply parsed as a document but an entry is missing a field, carries a
    /// mistyped field, or addresses a vertex index outside the request.
    MalformedResponse(String),

    /// The reply does not have the expected top-level shape.
    ProtocolMismatch(String),

    /// Indicates an attempt to access a vertex index that exceeds the graph size (N).
    NodeIndexOutOfBounds(usize),

    /// A request document could not be encoded.
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::VertexDuplicate(v) => write!(f, "Vertex {} is already in the graph.", v),

            Error::VertexNotFound(v) => write!(f, "Vertex {} is not in the graph.", v),

            Error::EdgeAlreadyExists(a, b) => {
                write!(f, "An edge between {} and {} already exists.", a, b)
            }

            Error::EdgeSelfLoop(v) => write!(f, "Vertex {} cannot be connected to itself.", v),

            Error::EdgeNotFound(a, b) => write!(f, "No edge connects {} and {}.", a, b),

            Error::MalformedResponse(reason) => write!(f, "Malformed solver response: {}", reason),

            Error::ProtocolMismatch(reason) => {
                write!(f, "Unexpected solver response shape: {}", reason)
            }

            Error::NodeIndexOutOfBounds(n) => write!(f, "Node index {} is out of bounds.", n),

            Error::Serialization(reason) => write!(f, "Failed to encode request: {}", reason),
        }
    }
}

impl std::error::Error for Error {}
