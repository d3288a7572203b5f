//! CLI client for the `latticelabd` daemon.
//!
//! Examples:
//!   latticelab-cli random 12 0.6 "all random" 7
//!   latticelab-cli run maxviolation 20
//!   latticelab-cli history
//!   latticelab-cli preset enochlophobia
//!   latticelab-cli start 42
//!   latticelab-cli tick 10
//!
//! By default it talks to 127.0.0.1:9877; override with `--addr host:port`.

use latticelab::edgelist::parse_edge_line;
use latticelab::observer::{CellSnapshot, GraphSnapshot};
use latticelab::session::{Request, Response};
use serde::Serialize;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;
use std::time::Duration;

/// Requests only the daemon understands.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum Control {
    Shutdown,
}

fn usage() -> ! {
    eprintln!("latticelab-cli (talks to latticelabd @ 127.0.0.1:9877 by default)");
    eprintln!("Usage: latticelab-cli [--addr host:port] <command> [args]\n");
    eprintln!("Graph commands:");
    eprintln!("  load <path> [pattern] [seed]          Load an edge-list file on the daemon host");
    eprintln!("  edges <a-b>... [--pattern P]         Send edges inline, e.g. edges 1-2 2-3 3-1");
    eprintln!("  random <n> [p] [pattern] [seed]      Generate a connected random graph");
    eprintln!("  connected                            Check connectivity");
    eprintln!("  run <policy> <iterations>            Run ordered|maxviolation|montecarlo");
    eprintln!("  step <policy>                        One ungated iteration");
    eprintln!("  graph | history                      Show colouring or frustration history");
    eprintln!("Automaton commands:");
    eprintln!("  params                               Parameter schema");
    eprintln!("  config                               Current configuration");
    eprintln!("  set <key> <value>                    Change one parameter");
    eprintln!("  preset <name> [seed]                 default|dying-crawlers|enochlophobia|forever-lonely|surprise-me");
    eprintln!("  start [seed]                         Create grid and initial population");
    eprintln!("  tick [n]                             Advance n ticks (default 1)");
    eprintln!("  finish                               Tick until extinct or time limit");
    eprintln!("  cells                                Show the automaton");
    eprintln!("Daemon:");
    eprintln!("  shutdown                             Save config and exit daemon");
    process::exit(1);
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut addr = "127.0.0.1:9877".to_string();
    if args.len() >= 2 && args[0] == "--addr" {
        addr = args[1].clone();
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (addr, args)
}

fn send_request<T: Serialize>(addr: &str, req: &T) -> Result<Response, String> {
    let mut stream = TcpStream::connect(addr).map_err(|e| format!("connect: {e}"))?;
    stream
        .set_read_timeout(Some(Duration::from_secs(30)))
        .map_err(|e| format!("set_read_timeout: {e}"))?;
    let mut reader = BufReader::new(stream.try_clone().map_err(|e| format!("clone: {e}"))?);

    let line = serde_json::to_string(req).map_err(|e| format!("serialize: {e}"))?;
    stream
        .write_all(line.as_bytes())
        .and_then(|_| stream.write_all(b"\n"))
        .map_err(|e| format!("send: {e}"))?;

    let mut resp_line = String::new();
    reader
        .read_line(&mut resp_line)
        .map_err(|e| format!("recv: {e}"))?;
    serde_json::from_str(&resp_line).map_err(|e| format!("parse response: {e}"))
}

fn print_graph(g: &GraphSnapshot) {
    println!(
        "vertices={} edges={} connected={} iterations={} total_frustration={:+.3}",
        g.vertex_count, g.edge_count, g.connected, g.iterations, g.total_frustration
    );
    for ((id, color), (_, f)) in g.coloring.iter().zip(g.frustration.iter()) {
        println!("  vertex {id:>4} color={color:.3} frustration={f:+.3}");
    }
}

fn print_cells(c: &CellSnapshot) {
    println!(
        "tick={}/{} grid={}x{} population={} finished={}",
        c.tick,
        c.time_limit,
        c.rows,
        c.cols,
        c.live.len(),
        c.finished
    );
    for (name, value) in &c.counters {
        println!("  {name:<26} {value}");
    }
}

fn print_response(resp: Response) {
    match resp {
        Response::GraphLoaded {
            graph,
            invalid_lines,
            read_error,
        } => {
            if let Some(err) = read_error {
                eprintln!("warning: could not read edge list ({err}); graph is empty");
            }
            for bad in &invalid_lines {
                eprintln!("skipped line {}: {:?}", bad.line, bad.content);
            }
            print_graph(&graph);
        }
        Response::Graph(g) => print_graph(&g),
        Response::History { values } => {
            for (t, v) in values.iter().enumerate() {
                println!("t={t:4} total_frustration={v:+.3}");
            }
        }
        Response::Connected { connected } => println!("connected={connected}"),
        Response::GraphRun {
            policy,
            policy_recognised,
            graph,
        } => {
            if !policy_recognised {
                eprintln!("policy not recognised; daemon ran {policy}");
            }
            println!("policy={policy}");
            print_graph(&graph);
        }
        Response::Params { params } => {
            println!("Cell automaton parameters:");
            for p in params {
                println!(
                    "- {} ({}) min={} max={} default={}",
                    p.key, p.label, p.min, p.max, p.default
                );
            }
        }
        Response::Config(cfg) => {
            for (key, value) in cfg.entries() {
                println!("{key:<22} {value}");
            }
            if let Some(seed) = cfg.seed {
                println!("{:<22} {seed}", "seed");
            }
        }
        Response::Cells(c) => print_cells(&c),
        Response::CellRunFinished { outcome, cells } => {
            println!("stopped after {} ticks ({:?})", outcome.ticks, outcome.reason);
            print_cells(&cells);
        }
        Response::Success { message } => println!("{message}"),
        Response::Error { message } => {
            eprintln!("Error: {message}");
            process::exit(1);
        }
    }
}

fn main() {
    let (addr, args) = parse_args();
    let cmd = &args[0];

    let make_error = |msg: &str| -> ! {
        eprintln!("{}", msg);
        process::exit(1);
    };
    let opt_seed = |i: usize| -> Option<u64> {
        args.get(i).map(|s| {
            s.parse()
                .unwrap_or_else(|_| make_error("seed must be a whole number"))
        })
    };
    let pattern_at = |i: usize| -> String {
        args.get(i)
            .cloned()
            .unwrap_or_else(|| "all 0".to_string())
    };

    if cmd == "shutdown" {
        match send_request(&addr, &Control::Shutdown) {
            Ok(resp) => print_response(resp),
            Err(e) => make_error(&format!("Failed: {e}")),
        }
        return;
    }

    let req = match cmd.as_str() {
        "load" => {
            if args.len() < 2 {
                usage();
            }
            Request::LoadEdgeFile {
                path: args[1].clone(),
                pattern: pattern_at(2),
                seed: opt_seed(3),
            }
        }
        "edges" => {
            let mut edges = Vec::new();
            let mut pattern = "all 0".to_string();
            let mut i = 1;
            while i < args.len() {
                if args[i] == "--pattern" {
                    pattern = args
                        .get(i + 1)
                        .cloned()
                        .unwrap_or_else(|| make_error("--pattern needs a value"));
                    i += 2;
                    continue;
                }
                let edge = parse_edge_line(&args[i].replace('-', ","))
                    .unwrap_or_else(|| make_error("edges are written a-b, e.g. 1-2"));
                edges.push(edge);
                i += 1;
            }
            if edges.is_empty() {
                usage();
            }
            Request::SetEdges {
                edges,
                pattern,
                seed: None,
            }
        }
        "random" => {
            if args.len() < 2 {
                usage();
            }
            let vertices: usize = args[1]
                .parse()
                .unwrap_or_else(|_| make_error("vertex count must be a number (2-75)"));
            let probability: f64 = match args.get(2) {
                Some(p) => p
                    .parse()
                    .unwrap_or_else(|_| make_error("probability must be a number (0-1)")),
                None => 0.6,
            };
            Request::GenerateRandomGraph {
                vertices,
                probability,
                pattern: pattern_at(3),
                seed: opt_seed(4),
            }
        }
        "connected" => Request::CheckConnected,
        "run" => {
            if args.len() < 3 {
                usage();
            }
            let iterations: usize = args[2]
                .parse()
                .unwrap_or_else(|_| make_error("iterations must be a whole number"));
            Request::RunGraph {
                policy: args[1].clone(),
                iterations,
            }
        }
        "step" => {
            if args.len() < 2 {
                usage();
            }
            Request::StepGraph {
                policy: args[1].clone(),
            }
        }
        "graph" => Request::GetGraph,
        "history" => Request::GetHistory,
        "params" => Request::CellParams,
        "config" => Request::CellConfigGet,
        "set" => {
            if args.len() < 3 {
                usage();
            }
            let value: f64 = args[2]
                .parse()
                .unwrap_or_else(|_| make_error("value must be a number"));
            Request::CellConfigSet {
                key: args[1].clone(),
                value,
            }
        }
        "preset" => {
            if args.len() < 2 {
                usage();
            }
            Request::CellPreset {
                name: args[1].clone(),
                seed: opt_seed(2),
            }
        }
        "start" => Request::CellStart { seed: opt_seed(1) },
        "tick" => {
            let ticks: u64 = match args.get(1) {
                Some(n) => n
                    .parse()
                    .unwrap_or_else(|_| make_error("tick count must be a whole number")),
                None => 1,
            };
            Request::CellTick { ticks }
        }
        "finish" => Request::CellRun,
        "cells" => Request::GetCells,
        _ => usage(),
    };

    match send_request(&addr, &req) {
        Ok(resp) => print_response(resp),
        Err(e) => {
            eprintln!("Failed: {e}");
            process::exit(1);
        }
    }
}
