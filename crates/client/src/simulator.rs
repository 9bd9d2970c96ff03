use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::config::SimulatorConfig;
use super::csv_loader::LoadedGraph;
use super::error::Error;
use funny_graphs_core::Graph;

/// Attempts per requested edge before giving up on a crowded graph.
const ATTEMPTS_PER_EDGE: usize = 8;

/// Produces random graphs for trying out a solver.
///
/// Endpoints are drawn uniformly; pairs that would form a self loop or a
/// second edge on the same unordered pair are redrawn.
pub struct GraphSimulator {
    pub config: SimulatorConfig,
    rng: SmallRng,
}

impl GraphSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        GraphSimulator {
            config,
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Deterministic generator, for reproducible runs.
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Self {
        GraphSimulator {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self) -> Result<LoadedGraph, Error> {
        let total_nodes = self.config.total_nodes;
        if total_nodes == 0 {
            return Err(Error::InvalidInput(
                "simulator needs at least one vertex".to_string(),
            ));
        }

        let mut graph = Graph::new();
        let vertices: Vec<_> = (0..total_nodes).map(|_| graph.insert_vertex()).collect();

        let weight_range = self.config.min_weight..=self.config.max_weight;
        let node_range = 0..total_nodes;

        let mut attempts = 0;
        while graph.edge_count() < self.config.edge_count
            && attempts < self.config.edge_count * ATTEMPTS_PER_EDGE
        {
            attempts += 1;

            let a = vertices[self.rng.random_range(node_range.clone())];
            let b = vertices[self.rng.random_range(node_range.clone())];
            if a == b || graph.contains_edge(a, b) {
                continue;
            }

            let weight = self.rng.random_range(weight_range.clone());
            graph.connect(a, b, weight)?;
        }

        info!(
            vertices = graph.len(),
            edges = graph.edge_count(),
            requested_edges = self.config.edge_count,
            "random graph generated"
        );
        Ok(LoadedGraph { graph, vertices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn config(total_nodes: usize, edge_count: usize) -> SimulatorConfig {
        SimulatorConfig {
            total_nodes,
            edge_count,
            min_weight: -3,
            max_weight: 10,
        }
    }

    #[test]
    fn generates_requested_shape() {
        let mut sim = GraphSimulator::with_seed(config(10, 15), 7);

        let loaded = sim.generate().unwrap();

        assert_eq!(loaded.graph.len(), 10);
        assert_eq!(loaded.graph.edge_count(), 15);
        assert_eq!(loaded.vertices.len(), 10);
    }

    #[test]
    fn weights_and_pairs_respect_constraints() {
        let mut sim = GraphSimulator::with_seed(config(6, 12), 42);

        let loaded = sim.generate().unwrap();

        let mut pairs = HashSet::new();
        for edge in loaded.graph.edges() {
            assert!((-3..=10).contains(&edge.weight), "weight out of bounds");
            assert_ne!(edge.a, edge.b);
            assert!(pairs.insert((edge.a.min(edge.b), edge.a.max(edge.b))));
        }
    }

    #[test]
    fn saturated_graph_stops_early() {
        // Two vertices admit a single edge.
        let mut sim = GraphSimulator::with_seed(config(2, 5), 1);

        let loaded = sim.generate().unwrap();
        assert_eq!(loaded.graph.edge_count(), 1);
    }

    #[test]
    fn empty_graph_is_rejected() {
        let mut sim = GraphSimulator::with_seed(config(0, 5), 1);
        assert!(matches!(sim.generate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn same_seed_same_graph() {
        let first = GraphSimulator::with_seed(config(8, 10), 99)
            .generate()
            .unwrap();
        let second = GraphSimulator::with_seed(config(8, 10), 99)
            .generate()
            .unwrap();

        assert_eq!(
            first.graph.serialize().unwrap(),
            second.graph.serialize().unwrap()
        );
    }
}
