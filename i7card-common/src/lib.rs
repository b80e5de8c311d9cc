//! Shared library for the i7card tools
//!
//! Holds everything the importer and the standalone tools have in common:
//! the error type, configuration resolution, the relation catalog, and
//! database pool initialization (including schema creation).

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
