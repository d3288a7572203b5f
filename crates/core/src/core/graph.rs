use core::fmt;
use core::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thiserror::Error;
use tracing::debug;

use crate::frustration::{flip, global_metric, local_metric, Color};
use crate::prng::Prng;
use crate::topology::{build_topology, CsrAdjacency, Edge, Topology, VertexId, VertexIndex};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("graph is not connected; simulation rejected")]
    Disconnected,
    #[error("unknown color pattern `{0}` (expected \"all 0\", \"all 1\", \"all random\" or \"uniform random\")")]
    UnknownColorPattern(String),
    #[error("random graph needs between {min} and {max} vertices, got {actual}")]
    VertexCount { min: usize, max: usize, actual: usize },
    #[error("edge probability {0} must be between 0.0 and 1.0")]
    EdgeProbability(f64),
    #[error("no connected random graph found after {0} attempts")]
    NoConnectedGraph(usize),
}

/// Initial colouring of every vertex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColorPattern {
    /// Every vertex gets `0.0`.
    #[default]
    AllZero,
    /// Every vertex gets `1.0`.
    AllOne,
    /// Independent fair draw of `0.0` or `1.0` per vertex.
    AllRandom,
    /// Independent continuous colour in `[0, 1)` per vertex.
    Uniform,
}

impl ColorPattern {
    pub fn name(self) -> &'static str {
        match self {
            ColorPattern::AllZero => "all 0",
            ColorPattern::AllOne => "all 1",
            ColorPattern::AllRandom => "all random",
            ColorPattern::Uniform => "uniform random",
        }
    }

    /// Colour for one vertex. Deterministic patterns never touch the generator.
    fn draw(self, rng: &mut Prng) -> Color {
        match self {
            ColorPattern::AllZero => 0.0,
            ColorPattern::AllOne => 1.0,
            ColorPattern::AllRandom => (rng.next_u32() >> 31) as Color,
            ColorPattern::Uniform => rng.next_f64_01(),
        }
    }
}

impl FromStr for ColorPattern {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all 0" | "0" => Ok(ColorPattern::AllZero),
            "all 1" | "1" => Ok(ColorPattern::AllOne),
            "all random" | "random" => Ok(ColorPattern::AllRandom),
            "uniform random" | "uniform" => Ok(ColorPattern::Uniform),
            _ => Err(GraphError::UnknownColorPattern(s.to_string())),
        }
    }
}

impl fmt::Display for ColorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rule for choosing which vertices to recolour in one iteration.
///
/// `MonteCarlo` is the named default: [`UpdatePolicy::from_name`] resolves any name other
/// than "ordered" or "maxviolation" to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UpdatePolicy {
    /// Sweep in vertex order, flipping every vertex with frustration `>= 0`.
    Ordered,
    /// Flip the single vertex with the strictly largest frustration (first wins ties).
    MaxViolation,
    /// Sweep in vertex order; a vertex with frustration `> 0` flips when
    /// `exp(frustration)` exceeds a fresh uniform draw.
    #[default]
    MonteCarlo,
}

impl UpdatePolicy {
    /// Case-insensitive exact match; `None` for anything unrecognised.
    pub fn try_from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ordered" => Some(UpdatePolicy::Ordered),
            "maxviolation" => Some(UpdatePolicy::MaxViolation),
            "montecarlo" => Some(UpdatePolicy::MonteCarlo),
            _ => None,
        }
    }

    /// Like [`try_from_name`](Self::try_from_name) but falls back to the default
    /// (`MonteCarlo`) for unrecognised names.
    pub fn from_name(name: &str) -> Self {
        Self::try_from_name(name).unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            UpdatePolicy::Ordered => "Ordered",
            UpdatePolicy::MaxViolation => "MaxViolation",
            UpdatePolicy::MonteCarlo => "MonteCarlo",
        }
    }
}

impl fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Execution tier for the global frustration recompute.
///
/// The recompute is a pure function of the current colours, so both tiers produce
/// identical results. The sweeps themselves are always sequential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExecutionTier {
    /// Single-threaded scalar execution (default, works everywhere).
    #[default]
    Scalar,
    /// Multi-threaded recompute (requires `parallel` feature).
    Parallel,
}

impl ExecutionTier {
    /// Tier that will actually run given the compiled features.
    pub fn effective(self) -> Self {
        match self {
            ExecutionTier::Parallel if cfg!(feature = "parallel") => ExecutionTier::Parallel,
            _ => ExecutionTier::Scalar,
        }
    }
}

/// Graph colouring simulation.
///
/// Vertex state lives in parallel arrays indexed by construction order:
/// `ids[i]`, `colors[i]`, `frustration[i]`, with neighbours in CSR form.
/// `frustration` always reflects the current colours; `history` gains one entry at
/// construction and one per iteration.
#[derive(Debug, Clone)]
pub struct FrustrationGraph {
    edges: Vec<Edge>,
    topology: Topology,
    pattern: ColorPattern,
    colors: Vec<Color>,
    frustration: Vec<f64>,
    history: Vec<f64>,
    iterations: u64,
    tier: ExecutionTier,
    rng: Prng,
}

impl FrustrationGraph {
    /// Build the graph, colour it and record the initial total frustration.
    pub fn new(edges: Vec<Edge>, pattern: ColorPattern, seed: Option<u64>) -> Self {
        Self::with_rng(edges, pattern, Prng::from_seed(seed))
    }

    pub fn with_rng(edges: Vec<Edge>, pattern: ColorPattern, mut rng: Prng) -> Self {
        let topology = build_topology(&edges);
        let colors: Vec<Color> = (0..topology.vertex_count())
            .map(|_| pattern.draw(&mut rng))
            .collect();
        let n = colors.len();

        let mut g = Self {
            edges,
            topology,
            pattern,
            colors,
            frustration: vec![0.0; n],
            history: Vec::new(),
            iterations: 0,
            tier: ExecutionTier::default(),
            rng,
        };
        g.recompute_frustration();
        g.record_total();
        g
    }

    pub fn set_execution_tier(&mut self, tier: ExecutionTier) {
        self.tier = tier;
    }

    pub fn execution_tier(&self) -> ExecutionTier {
        self.tier
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn pattern(&self) -> ColorPattern {
        self.pattern
    }

    pub fn vertex_count(&self) -> usize {
        self.colors.len()
    }

    pub fn ids(&self) -> &[VertexId] {
        self.topology.ids()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn frustrations(&self) -> &[f64] {
        &self.frustration
    }

    pub fn color(&self, id: VertexId) -> Option<Color> {
        self.topology.index_of(id).map(|i| self.colors[i])
    }

    pub fn frustration(&self, id: VertexId) -> Option<f64> {
        self.topology.index_of(id).map(|i| self.frustration[i])
    }

    /// Vertex -> colour in construction order.
    pub fn coloring(&self) -> Vec<(VertexId, Color)> {
        self.ids()
            .iter()
            .copied()
            .zip(self.colors.iter().copied())
            .collect()
    }

    /// Append-only record of total frustration; `len() == iterations + 1`.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn total_frustration(&self) -> f64 {
        global_metric(&self.frustration)
    }

    /// True iff every vertex is reachable from the first one.
    ///
    /// The empty graph counts as connected. Recomputed on every call.
    pub fn is_connected(&self) -> bool {
        is_connected(self.topology.adjacency())
    }

    /// Run `iterations` updates after checking connectivity.
    ///
    /// `policy_name` is matched case-insensitively; unrecognised names run `MonteCarlo`.
    /// A disconnected graph is rejected before anything is appended to the history.
    pub fn run_simulation(
        &mut self,
        policy_name: &str,
        iterations: usize,
    ) -> Result<UpdatePolicy, GraphError> {
        let policy = UpdatePolicy::from_name(policy_name);
        self.run(policy, iterations)?;
        Ok(policy)
    }

    pub fn run(&mut self, policy: UpdatePolicy, iterations: usize) -> Result<(), GraphError> {
        if !self.is_connected() {
            return Err(GraphError::Disconnected);
        }
        for _ in 0..iterations {
            self.run_iteration(policy);
        }
        Ok(())
    }

    /// One sweep of `policy`; appends exactly one history value and returns it.
    pub fn run_iteration(&mut self, policy: UpdatePolicy) -> f64 {
        let flipped = match policy {
            UpdatePolicy::Ordered => self.sweep_ordered(),
            UpdatePolicy::MaxViolation => self.flip_max_violation(),
            UpdatePolicy::MonteCarlo => self.sweep_monte_carlo(),
        };
        self.iterations += 1;
        let total = self.record_total();
        debug!(
            policy = policy.name(),
            iteration = self.iterations,
            flipped,
            total,
            "graph iteration"
        );
        total
    }

    fn sweep_ordered(&mut self) -> usize {
        let mut flipped = 0;
        for i in 0..self.colors.len() {
            // Later vertices see the effect of earlier flips in the same sweep.
            if self.frustration[i] >= 0.0 {
                self.flip_and_recompute(i);
                flipped += 1;
            }
        }
        flipped
    }

    fn flip_max_violation(&mut self) -> usize {
        let mut best: Option<(VertexIndex, f64)> = None;
        for (i, &f) in self.frustration.iter().enumerate() {
            match best {
                Some((_, b)) if f > b => best = Some((i, f)),
                None => best = Some((i, f)),
                _ => {}
            }
        }
        match best {
            Some((i, _)) => {
                self.flip_and_recompute(i);
                1
            }
            None => 0,
        }
    }

    fn sweep_monte_carlo(&mut self) -> usize {
        let mut flipped = 0;
        for i in 0..self.colors.len() {
            let local = self.frustration[i];
            if local > 0.0 {
                let draw = self.rng.next_f64_01();
                if local.exp() > draw {
                    self.flip_and_recompute(i);
                    flipped += 1;
                }
            }
        }
        flipped
    }

    fn flip_and_recompute(&mut self, i: VertexIndex) {
        self.colors[i] = flip(self.colors[i]);
        self.recompute_frustration();
    }

    /// Full recompute of every vertex from the current colours.
    fn recompute_frustration(&mut self) {
        let colors = &self.colors;
        let adjacency = self.topology.adjacency();
        match self.tier.effective() {
            #[cfg(feature = "parallel")]
            ExecutionTier::Parallel => {
                self.frustration
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(i, f)| *f = vertex_frustration(colors, adjacency, i));
            }
            _ => {
                for (i, f) in self.frustration.iter_mut().enumerate() {
                    *f = vertex_frustration(colors, adjacency, i);
                }
            }
        }
    }

    fn record_total(&mut self) -> f64 {
        let total = global_metric(&self.frustration);
        self.history.push(total);
        total
    }
}

#[inline]
fn vertex_frustration(colors: &[Color], adjacency: &CsrAdjacency, i: VertexIndex) -> f64 {
    local_metric(
        colors[i],
        adjacency.neighbours(i).iter().map(|&j| colors[j]),
    )
}

/// Iterative depth-first reachability from vertex 0.
///
/// Returns `true` for the empty graph.
pub fn is_connected(adjacency: &CsrAdjacency) -> bool {
    let n = adjacency.vertex_count();
    if n == 0 {
        return true;
    }
    let mut visited = vec![false; n];
    let mut stack = vec![0usize];
    visited[0] = true;
    let mut reached = 1usize;
    while let Some(i) = stack.pop() {
        for &j in adjacency.neighbours(i) {
            if !visited[j] {
                visited[j] = true;
                reached += 1;
                stack.push(j);
            }
        }
    }
    reached == n
}
