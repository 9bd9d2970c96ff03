pub mod csr;
pub mod graph;
pub mod interpreter;
pub mod solver;
pub mod traits;

pub use csr::GraphCSR;
pub use graph::{Edge, Graph, Snapshot};
pub use interpreter::{Annotation, Annotations, Distance, ResponseInterpreter, Rgb};
