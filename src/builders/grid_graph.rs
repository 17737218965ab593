use gxhash::{HashMap, HashMapExt, HashSet};
use ndarray::{Array2, ArrayView2};
use serde::Serialize;

pub type CellId = i64;

// Full 8-connectivity offsets; reverse-duplicate suppression keeps each
// unordered pair to a single emitted direction.
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

// 1/sqrt(2), scaling the mean-of-endpoints weight for the longer diagonal hop.
const DIAGONAL_SCALE: f64 = 0.70710678;

/// Edge list of the grid graph: three index-aligned columns, one edge per index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeList {
    pub sources: Vec<CellId>,
    pub destinations: Vec<CellId>,
    pub weights: Vec<f64>,
}

impl EdgeList {
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellId, CellId, f64)> + '_ {
        self.sources
            .iter()
            .zip(&self.destinations)
            .zip(&self.weights)
            .map(|((&s, &d), &w)| (s, d, w))
    }

    /// Per-distance-class edge counts, decoded from the cell ids.
    pub fn stats(&self, cols: usize) -> EdgeListStats {
        let mut orthogonal = 0;
        let mut diagonal = 0;
        for (from, to, _) in self.iter() {
            let (r0, c0) = cell_pos(from, cols);
            let (r1, c1) = cell_pos(to, cols);
            if r0 == r1 || c0 == c1 {
                orthogonal += 1;
            } else {
                diagonal += 1;
            }
        }
        EdgeListStats {
            edges: self.len(),
            orthogonal,
            diagonal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeListStats {
    pub edges: usize,
    pub orthogonal: usize,
    pub diagonal: usize,
}

/// 1-based row-major node id of cell `(row, col)`.
pub fn cell_id(row: usize, col: usize, cols: usize) -> CellId {
    (row * cols + col) as CellId + 1
}

fn cell_pos(id: CellId, cols: usize) -> (usize, usize) {
    let zero_based = (id - 1) as usize;
    (zero_based / cols, zero_based % cols)
}

/// Maps cells equal to the `nodata` sentinel to `None`, confining the magic
/// value to the input boundary. A NaN sentinel matches NaN cells.
pub fn mask_sentinel(values: ArrayView2<'_, f64>, nodata: f64) -> Array2<Option<f64>> {
    values.mapv(|v| {
        if v == nodata || (nodata.is_nan() && v.is_nan()) {
            None
        } else {
            Some(v)
        }
    })
}

fn has_edge(from: CellId, to: CellId, seen: &HashMap<CellId, HashSet<CellId>>) -> bool {
    seen.get(&from).is_some_and(|targets| targets.contains(&to))
}

/// Converts a masked raster into a weighted undirected edge list under
/// 8-connectivity. Missing cells contribute no edges; each unordered pair of
/// adjacent valid cells appears exactly once. Orthogonal neighbors weigh the
/// mean of the endpoint values, diagonal neighbors that mean scaled by 1/sqrt(2).
pub fn grid_to_edge_list(grid: ArrayView2<'_, Option<f64>>) -> EdgeList {
    let (rows, cols) = grid.dim();

    let mut seen: HashMap<CellId, HashSet<CellId>> = HashMap::new();
    let mut edges = EdgeList::default();

    for r0 in 0..rows {
        for c0 in 0..cols {
            let Some(v0) = grid[[r0, c0]] else {
                continue;
            };
            let from = cell_id(r0, c0, cols);

            for (dr, dc) in NEIGHBOR_OFFSETS {
                let r1 = r0 as isize + dr;
                let c1 = c0 as isize + dc;
                if r1 < 0 || r1 >= rows as isize || c1 < 0 || c1 >= cols as isize {
                    continue;
                }
                let (r1, c1) = (r1 as usize, c1 as usize);
                let Some(v1) = grid[[r1, c1]] else {
                    continue;
                };

                let to = cell_id(r1, c1, cols);
                if has_edge(to, from, &seen) {
                    continue;
                }

                let weight = if r0 == r1 || c0 == c1 {
                    0.5 * (v0 + v1)
                } else {
                    DIAGONAL_SCALE * (v0 + v1)
                };

                seen.entry(from).or_default().insert(to);
                edges.sources.push(from);
                edges.destinations.push(to);
                edges.weights.push(weight);
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, arr2};

    use super::{CellId, EdgeList, cell_id, grid_to_edge_list, mask_sentinel};

    const TOL: f64 = 1e-6;

    fn masked(values: &Array2<f64>) -> Array2<Option<f64>> {
        values.mapv(Some)
    }

    fn find_weight(edges: &EdgeList, a: CellId, b: CellId) -> Option<f64> {
        edges
            .iter()
            .find(|&(s, d, _)| (s, d) == (a, b) || (s, d) == (b, a))
            .map(|(_, _, w)| w)
    }

    #[test]
    fn cell_ids_are_one_based_row_major_and_distinct() {
        assert_eq!(cell_id(0, 0, 4), 1);
        assert_eq!(cell_id(0, 3, 4), 4);
        assert_eq!(cell_id(1, 0, 4), 5);
        assert_eq!(cell_id(2, 3, 4), 12);

        let mut ids = Vec::new();
        for r in 0..3 {
            for c in 0..4 {
                ids.push(cell_id(r, c, 4));
            }
        }
        let mut deduped = ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
        assert!(ids.iter().all(|&id| id > 0));
    }

    #[test]
    fn columns_are_index_aligned() {
        let grid = masked(&arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
        let edges = grid_to_edge_list(grid.view());
        assert_eq!(edges.sources.len(), edges.destinations.len());
        assert_eq!(edges.sources.len(), edges.weights.len());
        assert_eq!(edges.len(), edges.sources.len());
    }

    #[test]
    fn empty_and_single_cell_grids_yield_no_edges() {
        let zero_by_zero: Array2<Option<f64>> = Array2::from_elem((0, 0), None);
        assert!(grid_to_edge_list(zero_by_zero.view()).is_empty());

        let no_rows: Array2<Option<f64>> = Array2::from_elem((0, 5), None);
        assert!(grid_to_edge_list(no_rows.view()).is_empty());

        let single = masked(&arr2(&[[7.5]]));
        assert!(grid_to_edge_list(single.view()).is_empty());
    }

    #[test]
    fn all_missing_grid_yields_no_edges() {
        let grid: Array2<Option<f64>> = Array2::from_elem((4, 4), None);
        assert!(grid_to_edge_list(grid.view()).is_empty());
    }

    #[test]
    fn two_by_two_is_fully_connected_with_spec_weights() {
        let grid = masked(&arr2(&[[1.0, 2.0], [3.0, 4.0]]));
        let edges = grid_to_edge_list(grid.view());
        assert_eq!(edges.len(), 6);

        // Orthogonal pairs: mean of the endpoints.
        for (a, b, mean) in [
            (1, 2, 1.5),
            (1, 3, 2.0),
            (2, 4, 3.0),
            (3, 4, 3.5),
        ] {
            let w = find_weight(&edges, a, b).expect("orthogonal edge present");
            assert!((w - mean).abs() < TOL, "edge ({a},{b}): got {w}");
        }

        // Diagonal pairs: sum scaled by 1/sqrt(2).
        for (a, b, sum) in [(1, 4, 5.0), (2, 3, 5.0)] {
            let w = find_weight(&edges, a, b).expect("diagonal edge present");
            assert!((w - 0.70710678 * sum).abs() < TOL, "edge ({a},{b}): got {w}");
        }
    }

    #[test]
    fn no_pair_is_recorded_in_both_directions() {
        let grid = masked(&arr2(&[
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.0],
            [7.0, 8.0, 9.0],
        ]));
        let edges = grid_to_edge_list(grid.view());

        let directed: Vec<(CellId, CellId)> = edges
            .iter()
            .map(|(s, d, _)| (s, d))
            .collect();
        for &(s, d) in &directed {
            assert_ne!(s, d, "self-loop emitted for {s}");
            assert!(
                !directed.contains(&(d, s)),
                "pair ({s},{d}) recorded in both directions"
            );
        }
    }

    #[test]
    fn every_edge_joins_adjacent_valid_cells() {
        let mut grid = masked(&arr2(&[
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
        ]));
        grid[[1, 2]] = None;
        let cols = 4;
        let edges = grid_to_edge_list(grid.view());

        for (from, to, _) in edges.iter() {
            let (r0, c0) = (((from - 1) / cols as i64) as usize, ((from - 1) % cols as i64) as usize);
            let (r1, c1) = (((to - 1) / cols as i64) as usize, ((to - 1) % cols as i64) as usize);
            assert!(grid[[r0, c0]].is_some());
            assert!(grid[[r1, c1]].is_some());
            assert!(r0.abs_diff(r1) <= 1 && c0.abs_diff(c1) <= 1);
            assert!((r0, c0) != (r1, c1));
        }
    }

    #[test]
    fn missing_cell_removes_exactly_its_incident_edges() {
        let full = masked(&arr2(&[
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.0],
            [7.0, 8.0, 9.0],
        ]));
        let mut holed = full.clone();
        holed[[1, 1]] = None;
        let center = cell_id(1, 1, 3);

        let full_edges = grid_to_edge_list(full.view());
        let holed_edges = grid_to_edge_list(holed.view());

        // Center of a 3x3 touches all 8 other cells.
        let touching = full_edges
            .iter()
            .filter(|&(s, d, _)| s == center || d == center)
            .count();
        assert_eq!(touching, 8);
        assert_eq!(holed_edges.len(), full_edges.len() - 8);

        for (s, d, w) in holed_edges.iter() {
            assert_ne!(s, center);
            assert_ne!(d, center);
            let original = find_weight(&full_edges, s, d).expect("edge survives the hole");
            assert!((w - original).abs() < TOL);
        }
    }

    #[test]
    fn stats_split_edges_by_distance_class() {
        let grid = masked(&arr2(&[[1.0, 2.0], [3.0, 4.0]]));
        let stats = grid_to_edge_list(grid.view()).stats(2);
        assert_eq!(stats.edges, 6);
        assert_eq!(stats.orthogonal, 4);
        assert_eq!(stats.diagonal, 2);
    }

    #[test]
    fn mask_sentinel_targets_only_the_sentinel() {
        let values = arr2(&[[1.0, -9999.0], [-9999.0, 4.0]]);
        let grid = mask_sentinel(values.view(), -9999.0);
        assert_eq!(grid[[0, 0]], Some(1.0));
        assert_eq!(grid[[0, 1]], None);
        assert_eq!(grid[[1, 0]], None);
        assert_eq!(grid[[1, 1]], Some(4.0));

        let with_nan = arr2(&[[f64::NAN, 2.0]]);
        let grid = mask_sentinel(with_nan.view(), f64::NAN);
        assert_eq!(grid[[0, 0]], None);
        assert_eq!(grid[[0, 1]], Some(2.0));
    }
}
