pub mod graph;
pub mod meta;
