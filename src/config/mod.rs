//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overlay (RPC URL, account address, chain ID)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → passed explicitly to ChainClient
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Secrets never live in the file; only the name of the env var holding them
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ClientConfig;
pub use schema::{AccountConfig, NetworkConfig, ObservabilityConfig, TransactionConfig};
