pub mod args;
pub mod database;
pub mod error;
pub mod messaging;
pub mod model;
pub mod runner;
pub mod utils;
