//! Child/parent image comparison service library

pub mod config;
pub mod engine;
pub mod service;
pub mod api;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
