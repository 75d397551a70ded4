//! Core ttop library (snapshot model, collector, system sources, config).

pub mod collector;
pub mod config;
pub mod model;
pub mod sources;
