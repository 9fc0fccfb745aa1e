//! # pacmon
//!
//! Presentation layer of the budget-execution monitor: sessions over the
//! retrieval pipeline, terminal rendering, CSV/JSON export and the
//! interactive shell grammar. The `pacmon` binary wires these to clap.

pub mod export;
pub mod render;
pub mod session;
pub mod shell;

pub use session::{selection_from_args, Session};
