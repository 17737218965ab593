pub mod asc_grid;
