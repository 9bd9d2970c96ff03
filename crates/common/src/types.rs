use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance the solver reports for a vertex it never relaxed.
///
/// No reached vertex may report this value; solvers clamp real distances to
/// [`MAX_REACHED_DISTANCE`].
pub const UNREACHED_DISTANCE: i64 = i64::MAX;

/// Largest distance a reached vertex can report.
pub const MAX_REACHED_DISTANCE: i64 = UNREACHED_DISTANCE - 1;

/// Opaque handle to a vertex, valid for as long as the vertex stays in its graph.
///
/// The handle is an index into the graph's vertex arena plus the generation of
/// the slot at the time the handle was minted. Once the vertex is removed the
/// slot's generation moves on, so an old handle can never alias a newer vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Request document sent to the solver service.
///
/// Field order is part of the wire format: `start` first, then `vertices`.
/// `start` is omitted entirely when the graph has no start vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    pub vertices: Vec<RequestVertex>,
}

/// One vertex entry of a request. `id` equals the entry's array position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestVertex {
    pub id: usize,
    pub edges: Vec<OutgoingEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEdge {
    pub to: usize,
    pub weight: i32,
}

/// Response document returned by the solver service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveResponse {
    pub vertices: Vec<VertexResult>,
}

/// Shortest-path result for a single vertex, keyed by its request index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexResult {
    #[serde(rename = "id")]
    pub index: usize,
    pub distance: i64,
    #[serde(rename = "isInNegativeLoop")]
    pub is_in_negative_loop: bool,
}
