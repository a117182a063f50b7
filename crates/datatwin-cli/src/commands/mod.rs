pub mod generate;
pub mod graph;
pub mod preview;
