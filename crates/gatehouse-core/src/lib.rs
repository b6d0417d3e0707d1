//! # gatehouse-core
//!
//! Core crate for Gatehouse. Contains configuration schemas, typed
//! identifiers, and the unified error system shared by every other crate.
//!
//! This crate has **no** internal dependencies on other Gatehouse crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
