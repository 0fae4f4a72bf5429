pub mod gallery;
pub mod nearest_neighbor_index;
