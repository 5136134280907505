pub mod constants;
pub mod duel_matrix;
pub mod pruning;
pub mod ranker;
pub mod ranking_model;
pub mod scoring;
pub mod structures;
