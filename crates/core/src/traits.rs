use super::csr::GraphCSR;
use common::{
    error::Error,
    types::{SolveRequest, SolveResponse, VertexResult},
};

/// Trait for single-source shortest-path solvers that flag negative loops.
pub trait ShortestPathSolver {
    /// Computes the distance of every vertex from `source`.
    ///
    /// Returns one result per vertex, in index order, or `Err(e)` if `source`
    /// is not a vertex of `graph`.
    fn shortest_paths(&self, graph: &GraphCSR, source: usize) -> Result<Vec<VertexResult>, Error>;

    /// Answers a request document from `source`.
    fn answer(&self, request: &SolveRequest, source: usize) -> Result<SolveResponse, Error> {
        let graph = GraphCSR::from_request(request)?;
        let vertices = self.shortest_paths(&graph, source)?;
        Ok(SolveResponse { vertices })
    }
}
