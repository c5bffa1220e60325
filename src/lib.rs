//! Coffee inventory manager core.
//!
//! A local JSON catalog of coffees and a log of sales orders, kept in sync
//! with a remote inventory API by explicit push/pull or by watching the
//! catalog file for changes.

pub mod clock;
pub mod config;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod models;
pub mod remote;
pub mod report;
pub mod store;
pub mod sync;
pub mod watcher;

pub use error::{AppError, AppResult};
