// Library crate exposing modules for the binary, integration tests and benches

pub mod cli;
pub mod config;
pub mod graph;
pub mod model;
pub mod repository;
pub mod util;
