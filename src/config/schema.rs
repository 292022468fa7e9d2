//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the chain client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote node settings.
    pub network: NetworkConfig,

    /// Signing account settings.
    pub account: AccountConfig,

    /// Fee bounds and acceptance polling.
    pub transactions: TransactionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Remote node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Chain ID as a short string (e.g. "SN_SEPOLIA"). Queried from the node when unset.
    pub chain_id: Option<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// ERC-20 token reported by balance queries.
    pub balance_token_address: String,

    /// Display symbol of the balance token.
    pub balance_token_symbol: String,

    /// Decimal places of the balance token.
    pub balance_token_decimals: u8,

    /// Token v3 transaction fees are paid in (STRK).
    pub gas_token_address: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:5050".to_string(),
            chain_id: None,
            rpc_timeout_secs: 10,
            // Same addresses on mainnet and Sepolia.
            balance_token_address:
                "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7".to_string(),
            balance_token_symbol: "ETH".to_string(),
            balance_token_decimals: 18,
            gas_token_address:
                "0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d".to_string(),
        }
    }
}

/// Signing account configuration.
///
/// The private key itself is never part of the config file; only the name of
/// the environment variable holding it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Deployed account address used to sign transactions.
    pub address: Option<String>,

    /// Environment variable holding the hex-encoded private key.
    pub private_key_env: String,

    /// Class hash of the base account contract used for new accounts.
    pub class_hash: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            address: None,
            private_key_env: "STARK_PRIVATE_KEY".to_string(),
            // OpenZeppelin account v0.8.1
            class_hash: "0x061dac032f228abef9c6626f995015233097ae253a7f72d68552db02f2971b8f"
                .to_string(),
        }
    }
}

/// Transaction submission and acceptance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Maximum L1 gas units any submitted transaction may consume.
    pub max_gas: u64,

    /// Maximum price per gas unit, in fri (10^-18 STRK).
    pub max_gas_price_fri: u64,

    /// Interval between transaction status queries in milliseconds.
    pub poll_interval_ms: u64,

    /// Give up waiting for acceptance after this many seconds.
    pub acceptance_timeout_secs: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_gas: 50_000,
            max_gas_price_fri: 100_000_000_000_000, // 5 STRK cap in total
            poll_interval_ms: 2000,
            acceptance_timeout_secs: 300,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of the pretty format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.network.rpc_timeout_secs, 10);
        assert!(config.network.chain_id.is_none());
        assert!(config.account.address.is_none());
        assert_eq!(config.account.private_key_env, "STARK_PRIVATE_KEY");
        assert_eq!(config.transactions.poll_interval_ms, 2000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [network]
            rpc_url = "https://starknet-sepolia.example.org/rpc/v0_7"
            chain_id = "SN_SEPOLIA"

            [transactions]
            max_gas = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.network.chain_id.as_deref(), Some("SN_SEPOLIA"));
        assert_eq!(config.network.rpc_timeout_secs, 10);
        assert_eq!(config.transactions.max_gas, 5000);
        assert_eq!(config.transactions.max_gas_price_fri, 100_000_000_000_000);
        assert_eq!(config.transactions.acceptance_timeout_secs, 300);
        assert_eq!(config.observability.log_level, "info");
    }
}
