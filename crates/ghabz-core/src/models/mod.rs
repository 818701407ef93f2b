//! Data models: configuration, geometry and extraction output.

pub mod config;
pub mod extraction;
pub mod geometry;
