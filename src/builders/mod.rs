pub mod grid_graph;
