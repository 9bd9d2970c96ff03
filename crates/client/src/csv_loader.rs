use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use tracing::{error, info};

use super::error::Error;
use common::types::VertexId;
use funny_graphs_core::Graph;

/// Largest vertex count a loaded graph may have.
pub const MAX_VERTICES: usize = 100_000;

/// One `from,to,weight` row. Vertex numbers are dense, starting at zero.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct CsvEdgeRecord {
    #[serde(rename = "from")]
    pub from_node: usize,

    #[serde(rename = "to")]
    pub to_node: usize,

    #[serde(rename = "weight")]
    pub weight: i32,
}

/// A freshly built graph plus its handles, indexed by vertex number.
#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: Graph,
    pub vertices: Vec<VertexId>,
}

impl LoadedGraph {
    /// Marks vertex number `n` as the start.
    pub fn set_start(&mut self, n: usize) -> Result<(), Error> {
        let v = self.vertices.get(n).copied().ok_or_else(|| {
            Error::InvalidInput(format!(
                "start vertex {} does not exist ({} vertices)",
                n,
                self.vertices.len()
            ))
        })?;
        self.graph.set_start(v)?;
        Ok(())
    }
}

/// Builds a graph with `num_nodes` vertices and the given `(from, to, weight)` edges.
///
/// Edges go through the normal `connect` checks, so self loops and a second
/// edge on the same pair are rejected.
pub fn graph_from_edges(
    num_nodes: usize,
    edges: &[(usize, usize, i32)],
) -> Result<LoadedGraph, Error> {
    if num_nodes > MAX_VERTICES {
        return Err(Error::InvalidInput(format!(
            "{} vertices requested, at most {} supported",
            num_nodes, MAX_VERTICES
        )));
    }

    let mut graph = Graph::new();
    let vertices: Vec<VertexId> = (0..num_nodes).map(|_| graph.insert_vertex()).collect();

    for &(from, to, weight) in edges {
        let (Some(&a), Some(&b)) = (vertices.get(from), vertices.get(to)) else {
            return Err(Error::InvalidInput(format!(
                "edge {} -> {} refers to a vertex outside 0..{}",
                from, to, num_nodes
            )));
        };
        graph.connect(a, b, weight)?;
    }

    Ok(LoadedGraph { graph, vertices })
}

pub struct CsvGraphLoader {
    path: String,
}

impl CsvGraphLoader {
    pub fn new(path: String) -> Self {
        CsvGraphLoader { path }
    }

    fn parse_csv_to_edges(&self) -> Result<Vec<(usize, usize, i32)>, Error> {
        let file = File::open(&self.path).map_err(|e| {
            error!(path = %self.path, error = %e, "failed to read edge file");
            Error::IoError(e)
        })?;

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut edges = Vec::new();

        for result in rdr.deserialize() {
            let record: CsvEdgeRecord = result?;
            edges.push((record.from_node, record.to_node, record.weight));
        }
        Ok(edges)
    }

    /// Reads the file and builds the graph it describes.
    ///
    /// The vertex count is one more than the largest vertex number mentioned,
    /// which must stay below [`MAX_VERTICES`].
    pub fn load(&self) -> Result<LoadedGraph, Error> {
        let edges = self.parse_csv_to_edges()?;
        let num_nodes = match edges.iter().flat_map(|&(u, v, _)| [u, v]).max() {
            None => 0,
            Some(max_id) if max_id >= MAX_VERTICES => {
                error!(path = %self.path, vertex = max_id, "vertex number out of range");
                return Err(Error::InvalidInput(format!(
                    "vertex {} is out of range, numbers must be below {}",
                    max_id, MAX_VERTICES
                )));
            }
            Some(max_id) => max_id + 1,
        };

        let loaded = graph_from_edges(num_nodes, &edges)?;
        info!(
            path = %self.path,
            vertices = loaded.graph.len(),
            edges = loaded.graph.edge_count(),
            "graph loaded from csv"
        );
        Ok(loaded)
    }
}
