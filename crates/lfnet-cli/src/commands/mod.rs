pub mod config;
pub mod graph;
pub mod screen;
pub mod snapshot;
pub mod util;
