use hashbrown::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque vertex identifier as it appears in an edge list.
pub type VertexId = u64;

/// Position of a vertex in the construction-order vertex list.
pub type VertexIndex = usize;

/// Unordered pair of vertex identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge(pub VertexId, pub VertexId);

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.0 == self.1
    }
}

impl From<(VertexId, VertexId)> for Edge {
    fn from((a, b): (VertexId, VertexId)) -> Self {
        Self(a, b)
    }
}

/// CSR (Compressed Sparse Row) adjacency over vertex indices.
///
/// Vertex `i` owns `targets[offsets[i]..offsets[i + 1]]`.
/// Length of `offsets` is `vertex_count + 1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsrAdjacency {
    pub targets: Vec<VertexIndex>,
    pub offsets: Vec<usize>,
}

impl CsrAdjacency {
    #[inline]
    pub fn neighbours(&self, i: VertexIndex) -> &[VertexIndex] {
        &self.targets[self.offsets[i]..self.offsets[i + 1]]
    }

    pub fn vertex_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

/// Vertex list plus symmetric neighbour relation built from an edge list.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    ids: Vec<VertexId>,
    index: HashMap<VertexId, VertexIndex>,
    adjacency: CsrAdjacency,
}

impl Topology {
    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    pub fn vertex_count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: VertexId) -> Option<VertexIndex> {
        self.index.get(&id).copied()
    }

    pub fn adjacency(&self) -> &CsrAdjacency {
        &self.adjacency
    }

    /// Neighbour ids of `id` in first-seen order.
    pub fn neighbour_ids(&self, id: VertexId) -> Option<Vec<VertexId>> {
        let i = self.index_of(id)?;
        Some(
            self.adjacency
                .neighbours(i)
                .iter()
                .map(|&j| self.ids[j])
                .collect(),
        )
    }
}

/// Build the vertex list and neighbour relation from an ordered edge list.
///
/// Vertices appear in first-seen order. Each neighbour appears once per vertex no matter
/// how many parallel edges connect the pair, in the order the pair was first seen.
/// A self-loop registers its vertex but adds no neighbour entry.
/// An empty edge list yields an empty topology.
pub fn build_topology(edges: &[Edge]) -> Topology {
    let mut ids: Vec<VertexId> = Vec::new();
    let mut index: HashMap<VertexId, VertexIndex> = HashMap::new();

    let mut intern = |id: VertexId, ids: &mut Vec<VertexId>| -> VertexIndex {
        *index.entry(id).or_insert_with(|| {
            ids.push(id);
            ids.len() - 1
        })
    };

    let mut pairs: Vec<(VertexIndex, VertexIndex)> = Vec::with_capacity(edges.len());
    for edge in edges {
        let a = intern(edge.0, &mut ids);
        if edge.is_self_loop() {
            // Registers the vertex, contributes no neighbour.
            continue;
        }
        let b = intern(edge.1, &mut ids);
        pairs.push((a, b));
    }

    let mut lists: Vec<Vec<VertexIndex>> = vec![Vec::new(); ids.len()];
    let mut seen: hashbrown::HashSet<(VertexIndex, VertexIndex)> = hashbrown::HashSet::new();
    for (a, b) in pairs {
        let key = if a < b { (a, b) } else { (b, a) };
        if seen.insert(key) {
            lists[a].push(b);
            lists[b].push(a);
        }
    }

    let mut offsets = Vec::with_capacity(ids.len() + 1);
    let mut targets = Vec::new();
    offsets.push(0);
    for list in lists {
        targets.extend(list);
        offsets.push(targets.len());
    }

    Topology {
        ids,
        index,
        adjacency: CsrAdjacency { targets, offsets },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(u64, u64)]) -> Vec<Edge> {
        pairs.iter().map(|&p| Edge::from(p)).collect()
    }

    #[test]
    fn vertices_in_first_seen_order() {
        let t = build_topology(&edges(&[(0, 1), (0, 3), (1, 2), (3, 4)]));
        assert_eq!(t.ids(), &[0, 1, 3, 2, 4]);
        assert_eq!(t.neighbour_ids(0), Some(vec![1, 3]));
        assert_eq!(t.neighbour_ids(1), Some(vec![0, 2]));
        assert_eq!(t.neighbour_ids(4), Some(vec![3]));
    }

    #[test]
    fn parallel_edges_do_not_duplicate_neighbours() {
        let t = build_topology(&edges(&[(1, 2), (2, 1), (1, 2), (2, 3)]));
        assert_eq!(t.neighbour_ids(1), Some(vec![2]));
        assert_eq!(t.neighbour_ids(2), Some(vec![1, 3]));
        assert_eq!(t.adjacency().targets.len(), 4);
    }

    #[test]
    fn self_loop_registers_vertex_only() {
        let t = build_topology(&edges(&[(5, 5), (5, 6)]));
        assert_eq!(t.ids(), &[5, 6]);
        assert_eq!(t.neighbour_ids(5), Some(vec![6]));
    }

    #[test]
    fn neighbour_relation_is_symmetric() {
        let t = build_topology(&edges(&[(0, 1), (1, 2), (2, 0), (2, 3)]));
        let adj = t.adjacency();
        for i in 0..t.vertex_count() {
            for &j in adj.neighbours(i) {
                assert!(adj.neighbours(j).contains(&i));
                assert_ne!(i, j);
            }
        }
    }

    #[test]
    fn empty_edge_list() {
        let t = build_topology(&[]);
        assert!(t.is_empty());
        assert_eq!(t.adjacency().vertex_count(), 0);
        assert_eq!(t.neighbour_ids(1), None);
    }
}
