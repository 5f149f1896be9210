//! Access Control Engine

pub mod engine;

pub use engine::AccessEngine;
