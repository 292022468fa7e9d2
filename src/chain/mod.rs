//! Chain client facade.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key) + ClientConfig
//!     → wallet.rs (key pairs, account handles)
//!     → client.rs (RPC connection with timeouts)
//!     → artifact.rs + abi.rs (compiled class, function table)
//!     → contract.rs / account.rs (declare, deploy, call, invoke)
//!     → transaction.rs (wait for acceptance)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables or freshly generated
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod abi;
pub mod account;
pub mod artifact;
pub mod client;
pub mod contract;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use abi::{parse_arg_text, ContractAbi, FunctionAbi, Value};
pub use account::PendingAccount;
pub use artifact::ContractArtifact;
pub use client::ChainClient;
pub use contract::{Declaration, DeployedContract};
pub use transaction::{AcceptedTx, TxHandle};
pub use types::{ChainError, ChainResult, FeeBound, Finality, TxState, Uint256};
pub use wallet::{AccountHandle, KeyPair};
