pub mod frame_source;
pub mod geometry_resolver;
pub mod media_probe;
