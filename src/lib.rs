pub mod apdex;
pub mod config;
pub mod driver;
pub mod questions;
pub mod report;
pub mod resources;
pub mod results;
