//! Starknet account and contract interaction client.

pub mod chain;
pub mod config;
pub mod observability;

pub use chain::{ChainClient, ChainError, ChainResult};
pub use config::ClientConfig;
