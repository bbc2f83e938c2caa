//! Generic directed multigraph with a batching topological sort.
//!
//! Vertices are dense integer indices into an arena the caller owns; edges
//! are flat (from, to, label) triples. In/out-degree and adjacency are
//! computed by index, never by pointer traversal.


use std::cmp::Ordering;

///
/// GraphEdge
/// Parallel edges between the same vertex pair are permitted; the sort
/// treats them identically to a single edge.
///

#[derive(Clone, Debug)]
pub struct GraphEdge<L> {
    pub from: usize,
    pub to: usize,
    pub label: L,
}

///
/// GraphCycle
/// Residual vertex set left when no layering exists, with the labels of the
/// edges among those vertices.
///

#[derive(Clone, Debug)]
pub struct GraphCycle<L> {
    pub vertices: Vec<usize>,
    pub labels: Vec<L>,
}

///
/// DependencyGraph
///

#[derive(Clone, Debug)]
pub struct DependencyGraph<L> {
    vertex_count: usize,
    edges: Vec<GraphEdge<L>>,
}

impl<L> Default for DependencyGraph<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> DependencyGraph<L> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertex_count: 0,
            edges: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_vertices(vertex_count: usize) -> Self {
        Self {
            vertex_count,
            edges: Vec::new(),
        }
    }

    pub fn add_vertex(&mut self) -> usize {
        let id = self.vertex_count;
        self.vertex_count += 1;

        id
    }

    pub fn add_edge(&mut self, from: usize, to: usize, label: L) {
        debug_assert!(from < self.vertex_count && to < self.vertex_count);
        self.edges.push(GraphEdge { from, to, label });
    }

    #[must_use]
    pub const fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn edges(&self) -> &[GraphEdge<L>] {
        &self.edges
    }
}

impl<L: Clone> DependencyGraph<L> {
    /// Layered Kahn's sort: repeatedly peel the set of vertices with no
    /// remaining incoming edge into the next wave. Every vertex in wave `k`
    /// has no incoming edge from any wave `>= k`; within a wave, order is
    /// free of dependencies.
    ///
    /// `tie_break` orders vertices within each wave for deterministic
    /// output only; it never creates or removes a dependency.
    pub fn batching_topo_sort(
        &self,
        tie_break: Option<&dyn Fn(usize, usize) -> Ordering>,
    ) -> Result<Vec<Vec<usize>>, GraphCycle<L>> {
        // Phase 1: in-degrees and adjacency from the flat edge list.
        let mut in_degree = vec![0usize; self.vertex_count];
        let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); self.vertex_count];
        for (index, edge) in self.edges.iter().enumerate() {
            in_degree[edge.to] += 1;
            out_edges[edge.from].push(index);
        }

        // Phase 2: peel zero-in-degree waves.
        let mut placed = vec![false; self.vertex_count];
        let mut remaining = self.vertex_count;
        let mut ready: Vec<usize> = (0..self.vertex_count)
            .filter(|&vertex| in_degree[vertex] == 0)
            .collect();
        let mut waves = Vec::new();

        while !ready.is_empty() {
            if let Some(compare) = tie_break {
                ready.sort_by(|&a, &b| compare(a, b));
            }
            let mut next = Vec::new();
            for &vertex in &ready {
                placed[vertex] = true;
                remaining -= 1;
                for &edge_index in &out_edges[vertex] {
                    let target = self.edges[edge_index].to;
                    in_degree[target] -= 1;
                    if in_degree[target] == 0 {
                        next.push(target);
                    }
                }
            }
            waves.push(ready);
            ready = next;
        }

        // Phase 3: a non-empty residual set is a cycle.
        if remaining > 0 {
            let vertices: Vec<usize> = (0..self.vertex_count)
                .filter(|&vertex| !placed[vertex])
                .collect();
            let labels: Vec<L> = self
                .edges
                .iter()
                .filter(|edge| !placed[edge.from] && !placed[edge.to])
                .map(|edge| edge.label.clone())
                .collect();

            return Err(GraphCycle { vertices, labels });
        }

        Ok(waves)
    }
}
