use petgraph::graph::{NodeIndex, UnGraph};

use crate::builders::grid_graph::{CellId, EdgeList, cell_id};

/// Packages an edge list into a petgraph undirected graph with one node per
/// grid cell (node weight = its 1-based cell id) and one weighted edge per
/// edge-list row. Missing cells appear as isolated nodes.
pub fn graph_from_edge_list(rows: usize, cols: usize, edges: &EdgeList) -> UnGraph<CellId, f64> {
    let mut graph = UnGraph::with_capacity(rows * cols, edges.len());

    for r in 0..rows {
        for c in 0..cols {
            graph.add_node(cell_id(r, c, cols));
        }
    }

    for (from, to, weight) in edges.iter() {
        // Cell ids are 1-based; nodes were added in the same row-major order.
        let a = NodeIndex::new((from - 1) as usize);
        let b = NodeIndex::new((to - 1) as usize);
        graph.add_edge(a, b, weight);
    }

    graph
}
