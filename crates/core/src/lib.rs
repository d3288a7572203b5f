//! # latticelab
//!
//! Two small simulations that share one engine room:
//!
//! - a **graph frustration** model: vertices carry a colour in `[0, 1]`, each vertex
//!   measures how much it disagrees with its neighbours, and an update policy recolours
//!   vertices to drive the total frustration down;
//! - a **cell automaton** on a toroidal grid: cells age, divide into free neighbouring
//!   patches and die of old age, exhaustion or overcrowding.
//!
//! ## Quick Start
//!
//! ```
//! use latticelab::prelude::*;
//!
//! let edges = vec![Edge(1, 2), Edge(2, 3), Edge(3, 1)];
//! let mut graph = FrustrationGraph::new(edges, ColorPattern::AllZero, Some(7));
//! graph.run_simulation("maxviolation", 1).unwrap();
//! assert_eq!(graph.history(), &[3.0, -1.0]);
//!
//! let mut cells = CellSim::new(CellConfig::default().with_seed(42));
//! let outcome = cells.run();
//! assert!(outcome.ticks <= 100);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialization, the JSON config helpers and [`session`]
//! - `parallel`: recompute graph frustration on rayon workers
//!
//! ## Modules
//!
//! - [`graph`]: frustration graph and update policies
//! - [`automaton`]: cell automaton engine
//! - [`config`]: automaton parameter schema and presets
//! - [`observer`]: read-only snapshots for renderers and clients

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/topology.rs"]
pub mod topology;

#[path = "core/frustration.rs"]
pub mod frustration;

#[path = "core/graph.rs"]
pub mod graph;

#[path = "core/edgelist.rs"]
pub mod edgelist;

#[path = "core/random_graph.rs"]
pub mod random_graph;

#[path = "core/grid.rs"]
pub mod grid;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/automaton.rs"]
pub mod automaton;

#[cfg(feature = "serde")]
#[path = "core/session.rs"]
pub mod session;

pub mod observer;

/// Prelude module for convenient imports.
///
/// ```
/// use latticelab::prelude::*;
/// ```
pub mod prelude {
    pub use crate::automaton::{CellSim, RunOutcome, SimStats, StopReason};
    pub use crate::config::{CellConfig, ConfigError, Preset};
    pub use crate::graph::{ColorPattern, ExecutionTier, FrustrationGraph, GraphError, UpdatePolicy};
    pub use crate::grid::{CellId, Patch};
    pub use crate::observer::{CellAdapter, CellSnapshot, GraphAdapter, GraphSnapshot};
    pub use crate::random_graph::RandomGraphSpec;
    pub use crate::topology::{Edge, VertexId};
    #[cfg(feature = "serde")]
    pub use crate::session::{Request, Response, Session};
}
