//! CLI command implementations

pub mod config;
pub mod fetch;

pub use config::execute as config;
pub use fetch::execute as fetch;
