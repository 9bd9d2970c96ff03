use super::csr::GraphCSR;
use super::traits::ShortestPathSolver;
use common::{
    error::Error,
    types::{MAX_REACHED_DISTANCE, UNREACHED_DISTANCE, VertexResult},
};
use std::collections::VecDeque;
use tracing::debug;

/// Bellman-Ford single-source shortest paths with negative loop marking.
pub struct BellmanFordSolver;

impl BellmanFordSolver {
    /// Flags every vertex whose distance is undefined.
    ///
    /// After `n - 1` rounds all shortest paths without a negative loop are
    /// settled, so any vertex that can still be relaxed is fed by a negative
    /// loop. Everything reachable from such a vertex inherits the flag.
    fn mark_negative_loops(&self, graph: &GraphCSR, distance: &[Option<i64>]) -> Vec<bool> {
        let num_nodes = graph.num_nodes;
        let mut in_loop = vec![false; num_nodes];
        let mut queue = VecDeque::new();

        for u in 0..num_nodes {
            let Some(du) = distance[u] else { continue };
            for (v, weight) in graph.outgoing(u) {
                let candidate = du.saturating_add(weight).min(MAX_REACHED_DISTANCE);
                let relaxable = distance[v].is_none_or(|dv| candidate < dv);
                if relaxable && !in_loop[v] {
                    in_loop[v] = true;
                    queue.push_back(v);
                }
            }
        }

        while let Some(u) = queue.pop_front() {
            for (v, _) in graph.outgoing(u) {
                if !in_loop[v] {
                    in_loop[v] = true;
                    queue.push_back(v);
                }
            }
        }

        in_loop
    }
}

impl ShortestPathSolver for BellmanFordSolver {
    /// # Parameters
    /// - `graph`: The CSR data structure for fast edge traversal.
    /// - `source`: Start vertex index.
    ///
    /// # Returns
    /// One `VertexResult` per vertex. Vertices never reached report
    /// `UNREACHED_DISTANCE`.
    fn shortest_paths(&self, graph: &GraphCSR, source: usize) -> Result<Vec<VertexResult>, Error> {
        if source >= graph.num_nodes {
            return Err(Error::NodeIndexOutOfBounds(source));
        }

        let num_nodes = graph.num_nodes;
        let mut distance: Vec<Option<i64>> = vec![None; num_nodes];
        distance[source] = Some(0);

        let mut rounds = 0;
        for _ in 1..num_nodes {
            let mut changed = false;

            for u in 0..num_nodes {
                let Some(du) = distance[u] else { continue };
                for (v, weight) in graph.outgoing(u) {
                    let candidate = du.saturating_add(weight).min(MAX_REACHED_DISTANCE);
                    if distance[v].is_none_or(|dv| candidate < dv) {
                        distance[v] = Some(candidate);
                        changed = true;
                    }
                }
            }

            rounds += 1;
            if !changed {
                break;
            }
        }

        let in_loop = self.mark_negative_loops(graph, &distance);
        debug!(
            num_nodes,
            rounds,
            flagged = in_loop.iter().filter(|&&f| f).count(),
            "bellman-ford finished"
        );

        Ok((0..num_nodes)
            .map(|index| VertexResult {
                index,
                distance: distance[index].unwrap_or(UNREACHED_DISTANCE),
                is_in_negative_loop: in_loop[index],
            })
            .collect())
    }
}

#[cfg(test)]
mod bellman_ford_tests {
    use super::*;
    use crate::csr::IndexedEdge;

    fn build_graph(edges: &mut [IndexedEdge], num_nodes: usize) -> GraphCSR {
        GraphCSR::from_edges(num_nodes, edges).unwrap()
    }

    fn distances(results: &[VertexResult]) -> Vec<i64> {
        results.iter().map(|r| r.distance).collect()
    }

    fn flags(results: &[VertexResult]) -> Vec<bool> {
        results.iter().map(|r| r.is_in_negative_loop).collect()
    }

    #[test]
    fn chain_with_negative_edge() {
        let mut edges = vec![(0, 1, 3), (1, 2, -2)];
        let graph = build_graph(&mut edges, 3);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert_eq!(distances(&results), vec![0, 3, 1]);
        assert_eq!(flags(&results), vec![false, false, false]);
    }

    #[test]
    fn shorter_detour_wins() {
        let mut edges = vec![(0, 1, 10), (0, 2, 1), (2, 1, 2)];
        let graph = build_graph(&mut edges, 3);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert_eq!(distances(&results), vec![0, 3, 1]);
    }

    #[test]
    fn unreached_vertices_report_sentinel() {
        let mut edges = vec![(1, 0, 1)];
        let graph = build_graph(&mut edges, 3);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert_eq!(
            distances(&results),
            vec![0, UNREACHED_DISTANCE, UNREACHED_DISTANCE]
        );
        assert_eq!(flags(&results), vec![false, false, false]);
    }

    #[test]
    fn distances_past_i32_range_are_reported_exactly() {
        let max = i64::from(i32::MAX);
        let mut edges = vec![(0, 1, max), (1, 2, 1)];
        let graph = build_graph(&mut edges, 3);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert_eq!(distances(&results), vec![0, max, max + 1]);
        assert_eq!(flags(&results), vec![false, false, false]);
    }

    #[test]
    fn reached_distance_never_equals_sentinel() {
        let mut edges = vec![(0, 1, i64::MAX), (1, 2, i64::MAX)];
        let graph = build_graph(&mut edges, 3);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert_eq!(
            distances(&results),
            vec![0, MAX_REACHED_DISTANCE, MAX_REACHED_DISTANCE]
        );
    }

    #[test]
    fn negative_loop_and_downstream_are_flagged() {
        // 0 -> 1 <-> 2 is a loop of weight -1, 2 -> 3 hangs off it.
        let mut edges = vec![(0, 1, 1), (1, 2, 1), (2, 1, -2), (2, 3, 5), (4, 0, 1)];
        let graph = build_graph(&mut edges, 5);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert_eq!(flags(&results), vec![false, true, true, true, false]);
        assert_eq!(results[4].distance, UNREACHED_DISTANCE);
    }

    #[test]
    fn unreachable_negative_loop_is_not_flagged() {
        let mut edges = vec![(0, 1, 1), (2, 3, -5), (3, 2, 1)];
        let graph = build_graph(&mut edges, 4);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert_eq!(flags(&results), vec![false, false, false, false]);
    }

    #[test]
    fn zero_weight_loop_is_not_negative() {
        let mut edges = vec![(0, 1, 2), (1, 0, -2)];
        let graph = build_graph(&mut edges, 2);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert_eq!(distances(&results), vec![0, 2]);
        assert_eq!(flags(&results), vec![false, false]);
    }

    #[test]
    fn single_node_graph() {
        let graph = build_graph(&mut [], 1);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert_eq!(distances(&results), vec![0]);
    }

    #[test]
    fn empty_graph_returns_error() {
        let graph = build_graph(&mut [], 0);

        let result = BellmanFordSolver.shortest_paths(&graph, 0);
        assert!(matches!(result, Err(Error::NodeIndexOutOfBounds(0))));
    }

    #[test]
    fn large_linear_graph() {
        let n = 1000;
        let mut edges: Vec<IndexedEdge> = (0..n - 1).map(|i| (i, i + 1, -1)).collect();
        let graph = build_graph(&mut edges, n);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert_eq!(results[n - 1].distance, -(n as i64 - 1));
        assert!(results.iter().all(|r| !r.is_in_negative_loop));
    }

    #[test]
    fn large_circular_negative_loop_flags_everything() {
        let n = 500;
        let mut edges: Vec<IndexedEdge> = (0..n).map(|i| (i, (i + 1) % n, -1)).collect();
        let graph = build_graph(&mut edges, n);

        let results = BellmanFordSolver.shortest_paths(&graph, 0).unwrap();
        assert!(results.iter().all(|r| r.is_in_negative_loop));
    }
}
