//! Edge-list text format.
//!
//! One edge per line: two non-negative integers separated by a comma, optionally wrapped
//! in parentheses (`(1,2)` or `1, 2`). Blank lines and lines starting with `#` are ignored.
//! Any other line that is not an integer pair is reported and skipped.

use std::fs;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::warn;

use crate::topology::{Edge, VertexId};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InvalidLine {
    /// 1-based line number in the source text.
    pub line: usize,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeListReport {
    pub edges: Vec<Edge>,
    pub invalid: Vec<InvalidLine>,
    /// Set when the source file could not be read; `edges` is empty in that case.
    pub read_error: Option<String>,
}

impl EdgeListReport {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.read_error.is_none()
    }
}

pub fn parse_edge_line(line: &str) -> Option<Edge> {
    let stripped: String = line.chars().filter(|c| *c != '(' && *c != ')').collect();
    let mut parts = stripped.split(',');
    let a = parse_vertex(parts.next()?)?;
    let b = parse_vertex(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(Edge(a, b))
}

fn parse_vertex(s: &str) -> Option<VertexId> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

pub fn parse_edge_list(text: &str) -> EdgeListReport {
    let mut report = EdgeListReport::default();
    for (n, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_edge_line(line) {
            Some(edge) => report.edges.push(edge),
            None => {
                warn!(line = n + 1, content = line, "invalid edge line skipped");
                report.invalid.push(InvalidLine {
                    line: n + 1,
                    content: line.to_string(),
                });
            }
        }
    }
    report
}

/// Read and parse an edge-list file.
///
/// A missing or unreadable file yields an empty report with `read_error` set.
pub fn read_edge_list(path: impl AsRef<Path>) -> EdgeListReport {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(text) => parse_edge_list(&text),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read edge list");
            EdgeListReport {
                read_error: Some(format!("{}: {}", path.display(), e)),
                ..EdgeListReport::default()
            }
        }
    }
}
