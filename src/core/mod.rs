//! Core module - fundamental types and utilities

pub mod config;
pub mod error;
pub mod scalar;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use scalar::{Scalar, TypeLadder};
pub use store::{GraphStore, Row, SqliteStore, StoreError};
