pub mod flat_l2_index;
pub mod gallery_loader;
