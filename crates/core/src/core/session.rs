//! Request/response front door to both simulations.
//!
//! A [`Session`] owns at most one graph simulation and one automaton plus the current
//! automaton configuration. Every operation is a [`Request`] value answered by a
//! [`Response`] value, so any transport (TCP daemon, CLI, tests) drives it the same way.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::automaton::{CellSim, RunOutcome};
use crate::config::{param_specs, CellConfig, ConfigError, ParamKind, ParamSpec, Preset};
use crate::edgelist::{read_edge_list, InvalidLine};
use crate::graph::{ColorPattern, FrustrationGraph, GraphError, UpdatePolicy};
use crate::observer::{CellAdapter, CellSnapshot, GraphAdapter, GraphSnapshot};
use crate::prng::Prng;
use crate::random_graph::{generate_connected_graph, RandomGraphSpec, DEFAULT_EDGE_PROBABILITY};
use crate::topology::Edge;

fn default_pattern() -> String {
    ColorPattern::default().name().to_string()
}

fn default_probability() -> f64 {
    DEFAULT_EDGE_PROBABILITY
}

fn default_ticks() -> u64 {
    1
}

/// Owned copy of a [`ParamSpec`] for the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub key: String,
    pub label: String,
    pub kind: ParamKind,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl From<&ParamSpec> for ParamInfo {
    fn from(spec: &ParamSpec) -> Self {
        Self {
            key: spec.key.to_string(),
            label: spec.label.to_string(),
            kind: spec.kind,
            min: spec.min,
            max: spec.max,
            default: spec.default,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    // Graph
    LoadEdgeFile {
        path: String,
        #[serde(default = "default_pattern")]
        pattern: String,
        #[serde(default)]
        seed: Option<u64>,
    },
    SetEdges {
        edges: Vec<Edge>,
        #[serde(default = "default_pattern")]
        pattern: String,
        #[serde(default)]
        seed: Option<u64>,
    },
    GenerateRandomGraph {
        vertices: usize,
        #[serde(default = "default_probability")]
        probability: f64,
        #[serde(default = "default_pattern")]
        pattern: String,
        #[serde(default)]
        seed: Option<u64>,
    },
    CheckConnected,
    /// Connectivity-gated run of `iterations` updates.
    RunGraph {
        policy: String,
        iterations: usize,
    },
    /// One ungated update.
    StepGraph {
        policy: String,
    },
    GetGraph,
    GetHistory,

    // Automaton
    CellParams,
    CellConfigGet,
    CellConfigSet {
        key: String,
        value: f64,
    },
    CellPreset {
        name: String,
        #[serde(default)]
        seed: Option<u64>,
    },
    CellStart {
        #[serde(default)]
        seed: Option<u64>,
    },
    CellTick {
        #[serde(default = "default_ticks")]
        ticks: u64,
    },
    CellRun,
    GetCells,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    GraphLoaded {
        graph: GraphSnapshot,
        invalid_lines: Vec<InvalidLine>,
        /// Set when the file could not be read; the graph is then empty.
        #[serde(default)]
        read_error: Option<String>,
    },
    Graph(GraphSnapshot),
    History {
        values: Vec<f64>,
    },
    Connected {
        connected: bool,
    },
    GraphRun {
        policy: UpdatePolicy,
        /// False when the requested name was not recognised and the default ran.
        policy_recognised: bool,
        graph: GraphSnapshot,
    },
    Params {
        params: Vec<ParamInfo>,
    },
    Config(CellConfig),
    Cells(CellSnapshot),
    CellRunFinished {
        outcome: RunOutcome,
        cells: CellSnapshot,
    },
    Success {
        message: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no graph loaded")]
    NoGraph,
    #[error("no automaton started")]
    NoCells,
}

#[derive(Debug, Default)]
pub struct Session {
    graph: Option<FrustrationGraph>,
    cell_cfg: CellConfig,
    cells: Option<CellSim>,
}

impl Session {
    pub fn new(cell_cfg: CellConfig) -> Self {
        Self {
            graph: None,
            cell_cfg,
            cells: None,
        }
    }

    pub fn graph(&self) -> Option<&FrustrationGraph> {
        self.graph.as_ref()
    }

    pub fn cell_config(&self) -> &CellConfig {
        &self.cell_cfg
    }

    pub fn cells(&self) -> Option<&CellSim> {
        self.cells.as_ref()
    }

    /// Answer one request. Failures come back as [`Response::Error`].
    pub fn handle(&mut self, request: Request) -> Response {
        match self.dispatch(request) {
            Ok(resp) => resp,
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        }
    }

    fn dispatch(&mut self, request: Request) -> Result<Response, SessionError> {
        match request {
            Request::LoadEdgeFile {
                path,
                pattern,
                seed,
            } => {
                let pattern: ColorPattern = pattern.parse()?;
                let report = read_edge_list(&path);
                let graph = self.install_graph(report.edges, pattern, seed);
                Ok(Response::GraphLoaded {
                    graph,
                    invalid_lines: report.invalid,
                    read_error: report.read_error,
                })
            }
            Request::SetEdges {
                edges,
                pattern,
                seed,
            } => {
                let pattern: ColorPattern = pattern.parse()?;
                Ok(Response::Graph(self.install_graph(edges, pattern, seed)))
            }
            Request::GenerateRandomGraph {
                vertices,
                probability,
                pattern,
                seed,
            } => {
                let pattern: ColorPattern = pattern.parse()?;
                let spec = RandomGraphSpec::new(vertices).with_probability(probability);
                let mut rng = Prng::from_seed(seed);
                let edges = generate_connected_graph(spec, &mut rng)?;
                let graph = FrustrationGraph::with_rng(edges, pattern, rng);
                let snap = GraphAdapter::new(&graph).snapshot();
                self.graph = Some(graph);
                Ok(Response::Graph(snap))
            }
            Request::CheckConnected => {
                let g = self.graph.as_ref().ok_or(SessionError::NoGraph)?;
                Ok(Response::Connected {
                    connected: g.is_connected(),
                })
            }
            Request::RunGraph { policy, iterations } => {
                let g = self.graph.as_mut().ok_or(SessionError::NoGraph)?;
                let recognised = UpdatePolicy::try_from_name(&policy).is_some();
                if !recognised {
                    warn!(requested = %policy, "unknown update policy; running MonteCarlo");
                }
                let resolved = g.run_simulation(&policy, iterations)?;
                info!(
                    policy = resolved.name(),
                    iterations,
                    total = g.total_frustration(),
                    "graph run finished"
                );
                Ok(Response::GraphRun {
                    policy: resolved,
                    policy_recognised: recognised,
                    graph: GraphAdapter::new(g).snapshot(),
                })
            }
            Request::StepGraph { policy } => {
                let g = self.graph.as_mut().ok_or(SessionError::NoGraph)?;
                let recognised = UpdatePolicy::try_from_name(&policy).is_some();
                let resolved = UpdatePolicy::from_name(&policy);
                g.run_iteration(resolved);
                Ok(Response::GraphRun {
                    policy: resolved,
                    policy_recognised: recognised,
                    graph: GraphAdapter::new(g).snapshot(),
                })
            }
            Request::GetGraph => {
                let g = self.graph.as_ref().ok_or(SessionError::NoGraph)?;
                Ok(Response::Graph(GraphAdapter::new(g).snapshot()))
            }
            Request::GetHistory => {
                let g = self.graph.as_ref().ok_or(SessionError::NoGraph)?;
                Ok(Response::History {
                    values: g.history().to_vec(),
                })
            }
            Request::CellParams => Ok(Response::Params {
                params: param_specs().iter().map(ParamInfo::from).collect(),
            }),
            Request::CellConfigGet => Ok(Response::Config(self.cell_cfg)),
            Request::CellConfigSet { key, value } => {
                self.cell_cfg.set(&key, value)?;
                Ok(Response::Config(self.cell_cfg))
            }
            Request::CellPreset { name, seed } => {
                let preset: Preset = name.parse()?;
                let keep_seed = self.cell_cfg.seed;
                self.cell_cfg = preset.config(&mut Prng::from_seed(seed));
                self.cell_cfg.seed = keep_seed;
                Ok(Response::Config(self.cell_cfg))
            }
            Request::CellStart { seed } => {
                let mut cfg = self.cell_cfg;
                if seed.is_some() {
                    cfg.seed = seed;
                }
                cfg.validate()?;
                let sim = CellSim::new(cfg);
                let snap = CellAdapter::new(&sim).snapshot();
                self.cells = Some(sim);
                Ok(Response::Cells(snap))
            }
            Request::CellTick { ticks } => {
                let sim = self.cells.as_mut().ok_or(SessionError::NoCells)?;
                for _ in 0..ticks {
                    if sim.is_finished() {
                        break;
                    }
                    sim.tick();
                }
                Ok(Response::Cells(CellAdapter::new(sim).snapshot()))
            }
            Request::CellRun => {
                let sim = self.cells.as_mut().ok_or(SessionError::NoCells)?;
                let outcome = sim.run();
                Ok(Response::CellRunFinished {
                    outcome,
                    cells: CellAdapter::new(sim).snapshot(),
                })
            }
            Request::GetCells => {
                let sim = self.cells.as_ref().ok_or(SessionError::NoCells)?;
                Ok(Response::Cells(CellAdapter::new(sim).snapshot()))
            }
        }
    }

    fn install_graph(
        &mut self,
        edges: Vec<Edge>,
        pattern: ColorPattern,
        seed: Option<u64>,
    ) -> GraphSnapshot {
        let graph = FrustrationGraph::new(edges, pattern, seed);
        let snap = GraphAdapter::new(&graph).snapshot();
        self.graph = Some(graph);
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn six_edges() -> Vec<Edge> {
        [
            (0, 1),
            (0, 3),
            (0, 4),
            (0, 5),
            (1, 2),
            (1, 4),
            (1, 5),
            (2, 4),
            (2, 5),
            (3, 4),
            (3, 5),
            (4, 5),
        ]
        .iter()
        .map(|&p| Edge::from(p))
        .collect()
    }

    #[test]
    fn graph_requests_round_trip() {
        let mut s = Session::default();
        let resp = s.handle(Request::SetEdges {
            edges: six_edges(),
            pattern: "all 0".to_string(),
            seed: Some(1),
        });
        assert!(matches!(resp, Response::Graph(ref g) if g.history == vec![12.0]));

        let resp = s.handle(Request::RunGraph {
            policy: "ordered".to_string(),
            iterations: 1,
        });
        match resp {
            Response::GraphRun {
                policy,
                policy_recognised,
                graph,
            } => {
                assert_eq!(policy, UpdatePolicy::Ordered);
                assert!(policy_recognised);
                assert_eq!(graph.history, vec![12.0, -4.0]);
            }
            other => panic!("unexpected {other:?}"),
        }

        match s.handle(Request::GetHistory) {
            Response::History { values } => assert_eq!(values, vec![12.0, -4.0]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_policy_is_flagged() {
        let mut s = Session::default();
        s.handle(Request::SetEdges {
            edges: six_edges(),
            pattern: "all 1".to_string(),
            seed: Some(1),
        });
        match s.handle(Request::StepGraph {
            policy: "simulated-annealing".to_string(),
        }) {
            Response::GraphRun {
                policy,
                policy_recognised,
                ..
            } => {
                assert_eq!(policy, UpdatePolicy::MonteCarlo);
                assert!(!policy_recognised);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn disconnected_graph_run_is_an_error() {
        let mut s = Session::default();
        s.handle(Request::SetEdges {
            edges: vec![Edge(1, 2), Edge(3, 4)],
            pattern: "all 0".to_string(),
            seed: None,
        });
        assert!(matches!(
            s.handle(Request::CheckConnected),
            Response::Connected { connected: false }
        ));
        assert!(matches!(
            s.handle(Request::RunGraph {
                policy: "ordered".to_string(),
                iterations: 3
            }),
            Response::Error { .. }
        ));
        assert_eq!(s.graph().unwrap().history().len(), 1);
    }

    #[test]
    fn missing_graph_and_bad_pattern_are_errors() {
        let mut s = Session::default();
        assert!(matches!(s.handle(Request::GetGraph), Response::Error { .. }));
        assert!(matches!(
            s.handle(Request::SetEdges {
                edges: six_edges(),
                pattern: "plaid".to_string(),
                seed: None
            }),
            Response::Error { .. }
        ));
    }

    #[test]
    fn unreadable_edge_file_installs_empty_graph() {
        let mut s = Session::default();
        match s.handle(Request::LoadEdgeFile {
            path: "/no/such/edges.txt".to_string(),
            pattern: default_pattern(),
            seed: None,
        }) {
            Response::GraphLoaded {
                graph,
                invalid_lines,
                read_error,
            } => {
                assert!(read_error.is_some());
                assert!(invalid_lines.is_empty());
                assert_eq!(graph.vertex_count, 0);
                assert_eq!(graph.history, vec![0.0]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(s.graph().is_some());
        assert!(matches!(
            s.handle(Request::RunGraph {
                policy: "ordered".to_string(),
                iterations: 2
            }),
            Response::GraphRun { .. }
        ));
        assert_eq!(s.graph().unwrap().history(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn random_graph_is_connected() {
        let mut s = Session::default();
        match s.handle(Request::GenerateRandomGraph {
            vertices: 12,
            probability: 0.6,
            pattern: "all random".to_string(),
            seed: Some(8),
        }) {
            Response::Graph(g) => {
                assert_eq!(g.vertex_count, 12);
                assert!(g.connected);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cell_config_is_validated_at_the_boundary() {
        let mut s = Session::default();
        assert!(matches!(
            s.handle(Request::CellConfigSet {
                key: "rows".to_string(),
                value: 500.0
            }),
            Response::Error { .. }
        ));
        assert_eq!(s.cell_config().rows, 15);

        assert!(matches!(
            s.handle(Request::CellConfigSet {
                key: "rows".to_string(),
                value: 20.0
            }),
            Response::Config(CellConfig { rows: 20, .. })
        ));
    }

    #[test]
    fn cell_lifecycle() {
        let mut s = Session::default();
        assert!(matches!(s.handle(Request::GetCells), Response::Error { .. }));
        s.handle(Request::CellPreset {
            name: "enochlophobia".to_string(),
            seed: None,
        });
        assert_eq!(s.cell_config().time_limit, 75);

        match s.handle(Request::CellStart { seed: Some(5) }) {
            Response::Cells(c) => assert_eq!(c.live.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
        match s.handle(Request::CellTick { ticks: 3 }) {
            Response::Cells(c) => assert_eq!(c.tick, 3),
            other => panic!("unexpected {other:?}"),
        }
        match s.handle(Request::CellRun) {
            Response::CellRunFinished { outcome, cells } => {
                assert!(outcome.ticks <= 75);
                assert!(cells.finished);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn requests_use_tagged_json() {
        let req: Request =
            serde_json::from_str(r#"{"type":"RunGraph","policy":"MaxViolation","iterations":4}"#)
                .unwrap();
        assert!(matches!(req, Request::RunGraph { iterations: 4, .. }));

        let req: Request = serde_json::from_str(r#"{"type":"CellTick"}"#).unwrap();
        assert!(matches!(req, Request::CellTick { ticks: 1 }));

        let text = serde_json::to_string(&Response::Connected { connected: true }).unwrap();
        assert_eq!(text, r#"{"type":"Connected","connected":true}"#);
    }
}
