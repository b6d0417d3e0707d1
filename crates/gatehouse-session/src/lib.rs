//! # gatehouse-session
//!
//! In-memory registry of authenticated sessions.
//!
//! ## Modules
//!
//! - `model` — the [`Session`] record handed back to callers
//! - `store` — concurrent [`SessionStore`] (create, get, revoke)
//! - `sweeper` — periodic [`TimeoutSweeper`] evicting idle sessions
//! - `listener` — [`SessionListener`] hooks notified on expiration
//! - `manager` — [`SessionManager`] owning the store and sweeper lifecycle

pub mod listener;
pub mod manager;
pub mod model;
pub mod store;
pub mod sweeper;

pub use listener::SessionListener;
pub use manager::SessionManager;
pub use model::Session;
pub use store::SessionStore;
pub use sweeper::{SweepReport, SweeperHandle, TimeoutSweeper};
