use common::error::Error;
use common::types::SolveRequest;

/// Edge given by dense vertex indices: `(from, to, weight)`.
pub type IndexedEdge = (usize, usize, i64);

/// Graph in Compressed Sparse Row (CSR) format for fast graph traversal.
///
/// CSR format stores outgoing edges of each node contiguously in memory:
/// - `node_pointers[u]..node_pointers[u+1]` → edges from node `u`
/// - `edge_targets[i]` -> target node of edge `i`
/// - `edge_weights[i]` -> weight of edge `i`
#[derive(Debug, Clone)]
pub struct GraphCSR {
    pub num_nodes: usize,
    pub node_pointers: Vec<usize>,
    pub edge_targets: Vec<usize>,
    pub edge_weights: Vec<i64>,
}

impl GraphCSR {
    /// Creates a new CSR graph from a list of edges `(src, dst, weight)`.
    ///
    /// Edges are stored sorted by source node to ensure contiguous blocks
    /// for each node. The sort is stable, so edges of one node keep their
    /// relative order.
    ///
    /// # Errors
    /// Returns `Error::NodeIndexOutOfBounds` if an endpoint is `>= num_nodes`.
    pub fn from_edges(num_nodes: usize, edges: &mut [IndexedEdge]) -> Result<Self, Error> {
        if let Some(&(u, v, _)) = edges.iter().find(|&&(u, v, _)| u >= num_nodes || v >= num_nodes)
        {
            return Err(Error::NodeIndexOutOfBounds(u.max(v)));
        }

        edges.sort_by_key(|(src, _, _)| *src);

        let (node_pointers, edge_targets, edge_weights) =
            Self::build_csr_from_edges(num_nodes, edges);

        Ok(Self {
            num_nodes,
            node_pointers,
            edge_targets,
            edge_weights,
        })
    }

    /// Builds the CSR view of a request document.
    ///
    /// The node count is the number of vertex entries; every `id` and every
    /// edge target must address one of them.
    pub fn from_request(request: &SolveRequest) -> Result<Self, Error> {
        let num_nodes = request.vertices.len();
        let mut edges: Vec<IndexedEdge> = Vec::new();

        for vertex in &request.vertices {
            if vertex.id >= num_nodes {
                return Err(Error::NodeIndexOutOfBounds(vertex.id));
            }
            edges.extend(
                vertex
                    .edges
                    .iter()
                    .map(|e| (vertex.id, e.to, i64::from(e.weight))),
            );
        }

        Self::from_edges(num_nodes, &mut edges)
    }

    /// Two-pass counting construction of the CSR arrays.
    ///
    /// # Returns
    /// 1. `node_pointers`: starting index of each node's outgoing edges (size |V| + 1).
    /// 2. `edge_targets`: destination node for each edge.
    /// 3. `edge_weights`: weight of each edge.
    fn build_csr_from_edges(
        num_nodes: usize,
        edges: &[IndexedEdge],
    ) -> (Vec<usize>, Vec<usize>, Vec<i64>) {
        let m = edges.len();
        let mut node_pointers = vec![0; num_nodes + 1];

        for &(u, _, _) in edges {
            node_pointers[u + 1] += 1;
        }

        for i in 1..=num_nodes {
            node_pointers[i] += node_pointers[i - 1];
        }

        let mut edge_targets = vec![0; m];
        let mut edge_weights = vec![0; m];

        let mut cursor = node_pointers.clone();

        for &(u, v, weight) in edges {
            let pos = cursor[u]; // Next free slot for node 'u'
            edge_weights[pos] = weight;
            edge_targets[pos] = v;

            cursor[u] += 1;
        }

        (node_pointers, edge_targets, edge_weights)
    }

    /// Outgoing edges of `u` as `(target, weight)`.
    pub fn outgoing(&self, u: usize) -> impl Iterator<Item = (usize, i64)> + '_ {
        let start = self.node_pointers[u];
        let end = self.node_pointers[u + 1];
        (start..end).map(move |i| (self.edge_targets[i], self.edge_weights[i]))
    }

    pub fn num_edges(&self) -> usize {
        self.edge_targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::{OutgoingEdge, RequestVertex};

    #[test]
    fn from_edges_creates_correct_csr_for_small_graph() {
        let mut edges = vec![(2, 1, -1), (0, 2, 4), (0, 1, 7)]; // Un-sorted edges
        let csr = GraphCSR::from_edges(3, &mut edges).unwrap();

        assert_eq!(csr.node_pointers, vec![0, 2, 2, 3]);
        assert_eq!(csr.edge_targets, vec![2, 1, 1]);
        assert_eq!(csr.edge_weights, vec![4, 7, -1]);
        assert_eq!(csr.num_nodes, 3);
    }

    #[test]
    fn node_with_no_outgoing_edges() {
        let mut edges = vec![(0, 2, 1)];
        let csr = GraphCSR::from_edges(3, &mut edges).unwrap();

        assert_eq!(csr.node_pointers, vec![0, 1, 1, 1]);
        assert_eq!(csr.outgoing(1).count(), 0);
        assert_eq!(csr.outgoing(0).collect::<Vec<_>>(), vec![(2, 1)]);
    }

    #[test]
    fn empty_graph() {
        let csr = GraphCSR::from_edges(0, &mut []).unwrap();

        assert_eq!(csr.num_nodes, 0);
        assert_eq!(csr.node_pointers, vec![0]);
        assert!(csr.edge_targets.is_empty());
    }

    #[test]
    fn out_of_range_endpoint_is_rejected() {
        let result = GraphCSR::from_edges(2, &mut [(0, 5, 1)]);
        assert!(matches!(result, Err(Error::NodeIndexOutOfBounds(5))));
    }

    #[test]
    fn from_request_reads_outgoing_lists() {
        let request = SolveRequest {
            start: Some(0),
            vertices: vec![
                RequestVertex {
                    id: 0,
                    edges: vec![OutgoingEdge { to: 1, weight: 3 }],
                },
                RequestVertex {
                    id: 1,
                    edges: vec![OutgoingEdge { to: 2, weight: -2 }],
                },
                RequestVertex {
                    id: 2,
                    edges: vec![],
                },
            ],
        };

        let csr = GraphCSR::from_request(&request).unwrap();
        assert_eq!(csr.num_nodes, 3);
        assert_eq!(csr.num_edges(), 2);
        assert_eq!(csr.outgoing(1).collect::<Vec<_>>(), vec![(2, -2)]);
        assert_eq!(csr.outgoing(0).collect::<Vec<_>>(), vec![(1, 3)]);
    }

    #[test]
    fn from_request_rejects_dangling_target() {
        let request = SolveRequest {
            start: None,
            vertices: vec![RequestVertex {
                id: 0,
                edges: vec![OutgoingEdge { to: 3, weight: 1 }],
            }],
        };

        assert!(matches!(
            GraphCSR::from_request(&request),
            Err(Error::NodeIndexOutOfBounds(3))
        ));
    }
}
