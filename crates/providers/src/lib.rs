//! Budget-execution data providers for pacmon.
//!
//! All providers implement the `pacmon_core::ExpenditureProvider` trait.
//! The factory selects the correct provider based on configuration.

pub mod factory;
pub mod fixture;
pub mod siop;
pub mod sparql;

pub use factory::build_from_config;
pub use fixture::StaticProvider;
pub use siop::SiopProvider;
