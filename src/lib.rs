pub mod artdb;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod descriptor;
pub mod error;
pub mod matcher;
mod metrics;
pub mod payload;
pub mod server;
pub mod utils;
pub mod vector;

pub use artdb::{ArtDB, ArtDBBuilder};
pub use config::Opts;
