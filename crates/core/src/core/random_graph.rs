use crate::graph::{is_connected, GraphError};
use crate::prng::Prng;
use crate::topology::{build_topology, Edge, VertexId};

pub const MIN_VERTICES: usize = 2;
pub const MAX_VERTICES: usize = 75;
pub const DEFAULT_EDGE_PROBABILITY: f64 = 0.6;

/// Attempts made by [`generate_connected_graph`] before giving up.
pub const MAX_CONNECT_ATTEMPTS: usize = 64;

/// Parameters of an Erdos-Renyi style random graph on vertices `0..vertices`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RandomGraphSpec {
    pub vertices: usize,
    pub probability: f64,
}

impl RandomGraphSpec {
    pub fn new(vertices: usize) -> Self {
        Self {
            vertices,
            probability: DEFAULT_EDGE_PROBABILITY,
        }
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if !(MIN_VERTICES..=MAX_VERTICES).contains(&self.vertices) {
            return Err(GraphError::VertexCount {
                min: MIN_VERTICES,
                max: MAX_VERTICES,
                actual: self.vertices,
            });
        }
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(GraphError::EdgeProbability(self.probability));
        }
        Ok(())
    }
}

/// Connect each pair `(i, j)`, `i < j`, independently with probability `spec.probability`.
///
/// Edges come out in row-major pair order.
pub fn generate_random_graph(spec: RandomGraphSpec, rng: &mut Prng) -> Result<Vec<Edge>, GraphError> {
    spec.validate()?;
    let n = spec.vertices as VertexId;
    let mut edges = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if rng.next_f64_01() < spec.probability {
                edges.push(Edge(i, j));
            }
        }
    }
    Ok(edges)
}

/// Regenerate until the graph is connected and touches every vertex.
pub fn generate_connected_graph(
    spec: RandomGraphSpec,
    rng: &mut Prng,
) -> Result<Vec<Edge>, GraphError> {
    for _ in 0..MAX_CONNECT_ATTEMPTS {
        let edges = generate_random_graph(spec, rng)?;
        let topology = build_topology(&edges);
        if topology.vertex_count() == spec.vertices && is_connected(topology.adjacency()) {
            return Ok(edges);
        }
    }
    Err(GraphError::NoConnectedGraph(MAX_CONNECT_ATTEMPTS))
}
