use latticelab::automaton::{CellSim, StopReason};
use latticelab::config::{param_specs, CellConfig, ParamKind, Preset};
use latticelab::edgelist::read_edge_list;
use latticelab::graph::{ColorPattern, ExecutionTier, FrustrationGraph, UpdatePolicy};
use latticelab::observer::{CellAdapter, GraphAdapter};
use latticelab::prng::Prng;
use latticelab::random_graph::{generate_connected_graph, RandomGraphSpec};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" || args[1] == "help" {
        print_help();
        return;
    }

    let rest = &args[2..];
    let result = match args[1].as_str() {
        "graph" => run_graph_file(rest),
        "random-graph" => run_random_graph(rest),
        "cells" => run_cells(rest),
        "params" => {
            print_params();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_help() {
    println!("latticelab (graph frustration and cell automaton runner)");
    println!("usage:");
    println!("  latticelab graph <edge-file> [graph options]");
    println!("  latticelab random-graph <vertices> [--probability P] [graph options]");
    println!("  latticelab cells [--preset NAME] [--set key=value]... [--seed N]");
    println!("  latticelab params");
    println!("  latticelab --help");
    println!();
    println!("graph options:");
    println!("  --policy ordered|maxviolation|montecarlo   (default montecarlo)");
    println!("  --iterations N                             (default 10)");
    println!("  --pattern \"all 0\"|\"all 1\"|\"all random\"|\"uniform random\"");
    println!("  --seed N");
    println!("  --parallel                                 (rayon recompute; needs the parallel feature)");
}

/// Options shared by the graph commands.
struct GraphOpts {
    policy: String,
    iterations: usize,
    pattern: ColorPattern,
    seed: Option<u64>,
    probability: Option<f64>,
    tier: ExecutionTier,
}

fn parse_graph_opts(args: &[String]) -> Result<(Vec<String>, GraphOpts), String> {
    let mut positional = Vec::new();
    let mut opts = GraphOpts {
        policy: UpdatePolicy::default().name().to_string(),
        iterations: 10,
        pattern: ColorPattern::default(),
        seed: None,
        probability: None,
        tier: ExecutionTier::Scalar,
    };

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--policy" => opts.policy = value("--policy")?,
            "--iterations" => {
                opts.iterations = value("--iterations")?
                    .parse()
                    .map_err(|_| "--iterations must be a whole number".to_string())?
            }
            "--pattern" => {
                opts.pattern = value("--pattern")?.parse().map_err(|e| format!("{e}"))?
            }
            "--seed" => {
                opts.seed = Some(
                    value("--seed")?
                        .parse()
                        .map_err(|_| "--seed must be a whole number".to_string())?,
                )
            }
            "--probability" => {
                opts.probability = Some(
                    value("--probability")?
                        .parse()
                        .map_err(|_| "--probability must be a number".to_string())?,
                )
            }
            "--parallel" => opts.tier = ExecutionTier::Parallel,
            _ => positional.push(arg.clone()),
        }
    }
    Ok((positional, opts))
}

fn run_graph_file(args: &[String]) -> Result<(), String> {
    let (positional, opts) = parse_graph_opts(args)?;
    let path = positional.first().ok_or("graph needs an edge-list file")?;

    let report = read_edge_list(path);
    if let Some(err) = &report.read_error {
        eprintln!("warning: could not read edge list ({err}); continuing with an empty graph");
    }
    for bad in &report.invalid {
        eprintln!("skipping line {}: {:?}", bad.line, bad.content);
    }

    let graph = FrustrationGraph::new(report.edges, opts.pattern, opts.seed);
    simulate(graph, &opts)
}

fn run_random_graph(args: &[String]) -> Result<(), String> {
    let (positional, opts) = parse_graph_opts(args)?;
    let vertices: usize = positional
        .first()
        .ok_or("random-graph needs a vertex count")?
        .parse()
        .map_err(|_| "vertex count must be a whole number".to_string())?;

    let mut spec = RandomGraphSpec::new(vertices);
    if let Some(p) = opts.probability {
        spec = spec.with_probability(p);
    }
    let mut rng = Prng::from_seed(opts.seed);
    let edges = generate_connected_graph(spec, &mut rng).map_err(|e| e.to_string())?;
    println!("generated {} edges over {vertices} vertices", edges.len());

    let graph = FrustrationGraph::with_rng(edges, opts.pattern, rng);
    simulate(graph, &opts)
}

fn simulate(mut graph: FrustrationGraph, opts: &GraphOpts) -> Result<(), String> {
    if UpdatePolicy::try_from_name(&opts.policy).is_none() {
        eprintln!("unknown policy {:?}; using MonteCarlo", opts.policy);
    }
    graph.set_execution_tier(opts.tier);
    let policy = graph
        .run_simulation(&opts.policy, opts.iterations)
        .map_err(|e| e.to_string())?;

    let snap = GraphAdapter::new(&graph).snapshot();
    println!(
        "policy={} pattern={} tier={:?} vertices={} edges={} iterations={}",
        policy,
        graph.pattern(),
        graph.execution_tier().effective(),
        snap.vertex_count,
        snap.edge_count,
        snap.iterations
    );
    for (t, total) in snap.history.iter().enumerate() {
        println!("  t={t:4} total_frustration={total:+.3}");
    }
    println!("coloring:");
    for ((id, color), (_, f)) in snap.coloring.iter().zip(snap.frustration.iter()) {
        println!("  vertex {id:>4} color={color:.3} frustration={f:+.3}");
    }
    Ok(())
}

fn run_cells(args: &[String]) -> Result<(), String> {
    let mut cfg = CellConfig::default();
    let mut seed = None;

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--preset" => {
                let name = it.next().ok_or("--preset needs a name")?;
                let preset: Preset = name.parse().map_err(|e| format!("{e}"))?;
                cfg = preset.config(&mut Prng::from_seed(seed));
            }
            "--set" => {
                let pair = it.next().ok_or("--set needs key=value")?;
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected key=value, got {pair:?}"))?;
                let value: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| format!("{key}: {value:?} is not a number"))?;
                cfg.set(key.trim(), value).map_err(|e| e.to_string())?;
            }
            "--seed" => {
                seed = Some(
                    it.next()
                        .ok_or("--seed needs a value")?
                        .parse()
                        .map_err(|_| "--seed must be a whole number".to_string())?,
                );
            }
            other => return Err(format!("unexpected argument {other:?}")),
        }
    }
    cfg.seed = seed;

    println!("config:");
    for (key, value) in cfg.entries() {
        println!("  {key:<22} {value}");
    }

    let mut sim = CellSim::new(cfg);
    let report_every = (cfg.time_limit / 10).max(1);
    while !sim.is_finished() {
        let t = sim.tick();
        if t % report_every == 0 {
            println!("t={t:5} population={}", sim.population());
        }
    }

    let outcome = sim.outcome();
    let snap = CellAdapter::new(&sim).snapshot();
    println!(
        "stopped after {} ticks: {}",
        outcome.ticks,
        match outcome.reason {
            StopReason::Extinct => "population extinct",
            StopReason::TimeLimit => "time limit reached",
        }
    );
    for (name, value) in &snap.counters {
        println!("  {name:<26} {value}");
    }
    Ok(())
}

fn print_params() {
    println!("cell automaton parameters:");
    for p in param_specs() {
        let kind = match p.kind {
            ParamKind::Int => "int",
            ParamKind::Float => "float",
        };
        println!(
            "- {} ({}, {kind}) min={} max={} default={}",
            p.key, p.label, p.min, p.max, p.default
        );
    }
    println!("presets:");
    for preset in Preset::ALL {
        println!("- {preset}");
    }
}
