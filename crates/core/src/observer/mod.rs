use crate::automaton::{CellSim, SimStats};
use crate::graph::FrustrationGraph;
use crate::topology::VertexId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A read-only snapshot of a graph simulation.
///
/// Design intent:
/// - Observers cannot mutate or steer the simulation.
/// - Snapshotting is *on-demand* and allocates; the update loop stays unchanged.
/// - This is the surface renderers consume: a colouring plus the frustration history.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraphSnapshot {
    pub iterations: u64,
    pub vertex_count: usize,
    pub edge_count: usize,
    pub connected: bool,
    pub coloring: Vec<(VertexId, f64)>,
    pub frustration: Vec<(VertexId, f64)>,
    pub total_frustration: f64,
    pub history: Vec<f64>,
}

pub struct GraphAdapter<'a> {
    graph: &'a FrustrationGraph,
}

impl<'a> GraphAdapter<'a> {
    pub fn new(graph: &'a FrustrationGraph) -> Self {
        Self { graph }
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let g = self.graph;
        GraphSnapshot {
            iterations: g.iterations(),
            vertex_count: g.vertex_count(),
            edge_count: g.edges().len(),
            connected: g.is_connected(),
            coloring: g.coloring(),
            frustration: g
                .ids()
                .iter()
                .copied()
                .zip(g.frustrations().iter().copied())
                .collect(),
            total_frustration: g.total_frustration(),
            history: g.history().to_vec(),
        }
    }
}

/// One occupied patch as a renderer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LiveCell {
    pub row: usize,
    pub col: usize,
    pub age: u32,
    pub divisions: u32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellSnapshot {
    pub tick: u64,
    pub time_limit: u64,
    pub rows: usize,
    pub cols: usize,
    pub finished: bool,
    pub live: Vec<LiveCell>,
    pub stats: SimStats,
    pub counters: Vec<(String, u64)>,
}

pub struct CellAdapter<'a> {
    sim: &'a CellSim,
}

impl<'a> CellAdapter<'a> {
    pub fn new(sim: &'a CellSim) -> Self {
        Self { sim }
    }

    pub fn snapshot(&self) -> CellSnapshot {
        let s = self.sim;
        CellSnapshot {
            tick: s.ticks(),
            time_limit: s.config().time_limit,
            rows: s.grid().rows(),
            cols: s.grid().cols(),
            finished: s.is_finished(),
            live: s
                .cells()
                .map(|c| LiveCell {
                    row: c.patch.row,
                    col: c.patch.col,
                    age: c.age,
                    divisions: c.divisions,
                })
                .collect(),
            stats: *s.stats(),
            counters: s
                .stats()
                .named()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}
