use std::collections::HashMap;

use common::error::Error;
use common::types::{OutgoingEdge, RequestVertex, SolveRequest, VertexId};
use tracing::{debug, trace};

/// A weighted directed edge `a -> b`.
///
/// Uniqueness is enforced on the unordered pair `{a, b}`: the graph never holds
/// both `a -> b` and `b -> a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub a: VertexId,
    pub b: VertexId,
    pub weight: i32,
}

impl Edge {
    /// True if this edge joins `x` and `y`, in either direction.
    pub fn connects(&self, x: VertexId, y: VertexId) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    pub fn touches(&self, v: VertexId) -> bool {
        self.a == v || self.b == v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Detached,
    Member,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    state: SlotState,
}

/// Weighted directed graph edited by a single owner.
///
/// Vertices live in a generation-checked arena. Membership order is kept
/// separately in `vertices`: a vertex's position there is the index it gets in
/// a serialized request, and nothing else. Every successful mutation bumps
/// `revision`, which lets a caller tell whether a snapshot is still current.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    vertices: Vec<VertexId>,
    edges: Vec<Edge>,
    start: Option<VertexId>,
    revision: u64,
}

/// Serialized view of a graph together with the ordering used to produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub request: SolveRequest,
    /// `order[i]` is the vertex serialized with id `i`.
    pub order: Vec<VertexId>,
    /// Graph revision the snapshot was taken at.
    pub revision: u64,
}

impl Snapshot {
    pub fn vertex_at(&self, index: usize) -> Option<VertexId> {
        self.order.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Encodes the request as a single compact JSON line (without the newline).
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(&self.request).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a fresh handle that is not yet a member of the graph.
    ///
    /// Freed slots are reused; their generation was already advanced when the
    /// previous occupant was removed.
    pub fn allocate_vertex(&mut self) -> VertexId {
        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = SlotState::Detached;
            return VertexId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Detached,
        });
        VertexId {
            index,
            generation: 0,
        }
    }

    /// Appends `v` to the vertex sequence.
    ///
    /// # Errors
    /// `VertexDuplicate` if `v` is already a member, `VertexNotFound` if the
    /// handle was never minted by this graph or is stale.
    pub fn add_vertex(&mut self, v: VertexId) -> Result<(), Error> {
        match self.slot_state(v) {
            Some(SlotState::Member) => Err(Error::VertexDuplicate(v)),
            Some(SlotState::Detached) => {
                self.attach(v);
                Ok(())
            }
            Some(SlotState::Free) | None => Err(Error::VertexNotFound(v)),
        }
    }

    /// Mints a handle and adds it in one step.
    pub fn insert_vertex(&mut self) -> VertexId {
        let v = self.allocate_vertex();
        self.attach(v);
        v
    }

    /// Removes `v`, every edge touching it, and the start marker if it pointed at `v`.
    pub fn remove_vertex(&mut self, v: VertexId) -> Result<(), Error> {
        if !self.contains_vertex(v) {
            return Err(Error::VertexNotFound(v));
        }

        let edges_before = self.edges.len();
        self.edges.retain(|e| !e.touches(v));
        self.vertices.retain(|&member| member != v);
        if self.start == Some(v) {
            self.start = None;
        }

        let slot = &mut self.slots[v.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SlotState::Free;
        self.free_slots.push(v.index);

        self.revision += 1;
        debug!(
            vertex = %v,
            dropped_edges = edges_before - self.edges.len(),
            "vertex removed"
        );
        Ok(())
    }

    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.slot_state(v) == Some(SlotState::Member)
    }

    /// Adds the directed edge `a -> b`.
    ///
    /// # Errors
    /// - `EdgeSelfLoop` if `a == b`
    /// - `VertexNotFound` if either endpoint is not a member
    /// - `EdgeAlreadyExists` if `{a, b}` is already connected in either direction
    pub fn connect(&mut self, a: VertexId, b: VertexId, weight: i32) -> Result<(), Error> {
        if a == b {
            return Err(Error::EdgeSelfLoop(a));
        }
        for v in [a, b] {
            if !self.contains_vertex(v) {
                return Err(Error::VertexNotFound(v));
            }
        }
        if self.contains_edge(a, b) {
            return Err(Error::EdgeAlreadyExists(a, b));
        }

        self.edges.push(Edge { a, b, weight });
        self.revision += 1;
        trace!(from = %a, to = %b, weight, "edge added");
        Ok(())
    }

    /// Removes the edge on `{a, b}` if there is one. Never fails.
    pub fn disconnect(&mut self, a: VertexId, b: VertexId) {
        let before = self.edges.len();
        self.edges.retain(|e| !e.connects(a, b));
        if self.edges.len() != before {
            self.revision += 1;
        }
    }

    pub fn contains_edge(&self, a: VertexId, b: VertexId) -> bool {
        self.edges.iter().any(|e| e.connects(a, b))
    }

    /// The edge on `{a, b}`, whichever way it points.
    pub fn edge(&self, a: VertexId, b: VertexId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.connects(a, b))
    }

    /// Changes the weight of the edge on `{a, b}` in place, keeping its direction.
    pub fn set_weight(&mut self, a: VertexId, b: VertexId, weight: i32) -> Result<(), Error> {
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.connects(a, b))
            .ok_or(Error::EdgeNotFound(a, b))?;

        edge.weight = weight;
        self.revision += 1;
        Ok(())
    }

    pub fn set_start(&mut self, v: VertexId) -> Result<(), Error> {
        if !self.contains_vertex(v) {
            return Err(Error::VertexNotFound(v));
        }
        if self.start != Some(v) {
            self.start = Some(v);
            self.revision += 1;
        }
        Ok(())
    }

    pub fn clear_start(&mut self) {
        if self.start.take().is_some() {
            self.revision += 1;
        }
    }

    pub fn start(&self) -> Option<VertexId> {
        self.start
    }

    /// Members in insertion order.
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current position of `v` in the vertex sequence.
    pub fn index_of(&self, v: VertexId) -> Option<usize> {
        self.vertices.iter().position(|&member| member == v)
    }

    pub fn vertex_at(&self, index: usize) -> Option<VertexId> {
        self.vertices.get(index).copied()
    }

    /// Builds the request document for the current state.
    ///
    /// Vertex `i` of the sequence gets id `i`. Every edge is listed once, under
    /// its `a` endpoint, in the order edges were added.
    pub fn snapshot(&self) -> Snapshot {
        let index: HashMap<VertexId, usize> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, i))
            .collect();

        let mut outgoing: Vec<Vec<OutgoingEdge>> = vec![Vec::new(); self.vertices.len()];
        for edge in &self.edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.a), index.get(&edge.b)) {
                outgoing[from].push(OutgoingEdge {
                    to,
                    weight: edge.weight,
                });
            }
        }

        let vertices = outgoing
            .into_iter()
            .enumerate()
            .map(|(id, edges)| RequestVertex { id, edges })
            .collect();

        Snapshot {
            request: SolveRequest {
                start: self.start.and_then(|s| index.get(&s).copied()),
                vertices,
            },
            order: self.vertices.clone(),
            revision: self.revision,
        }
    }

    /// Canonical request line for the current state.
    pub fn serialize(&self) -> Result<String, Error> {
        self.snapshot().to_json()
    }

    fn slot_state(&self, v: VertexId) -> Option<SlotState> {
        self.slots
            .get(v.index as usize)
            .filter(|slot| slot.generation == v.generation)
            .map(|slot| slot.state)
    }

    fn attach(&mut self, v: VertexId) {
        self.slots[v.index as usize].state = SlotState::Member;
        self.vertices.push(v);
        self.revision += 1;
    }
}
