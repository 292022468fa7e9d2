//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint URLs and felt-encoded addresses/class hashes
//! - Validate value ranges (timeouts > 0, poll interval below timeout)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::chain::types::parse_felt;
use crate::config::schema::ClientConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.network.rpc_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "network.rpc_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("network.rpc_url", e.to_string())),
    }

    if config.network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "network.rpc_timeout_secs",
            "must be greater than zero",
        ));
    }

    if let Some(chain_id) = &config.network.chain_id {
        if chain_id.is_empty() || chain_id.len() > 31 || !chain_id.is_ascii() {
            errors.push(ValidationError::new(
                "network.chain_id",
                "must be a non-empty ASCII short string of at most 31 characters",
            ));
        }
    }

    check_felt(
        &mut errors,
        "network.balance_token_address",
        &config.network.balance_token_address,
    );
    check_felt(
        &mut errors,
        "network.gas_token_address",
        &config.network.gas_token_address,
    );
    if config.network.balance_token_decimals > 77 {
        errors.push(ValidationError::new(
            "network.balance_token_decimals",
            "must be at most 77",
        ));
    }
    check_felt(&mut errors, "account.class_hash", &config.account.class_hash);
    if let Some(address) = &config.account.address {
        check_felt(&mut errors, "account.address", address);
    }

    if config.account.private_key_env.trim().is_empty() {
        errors.push(ValidationError::new(
            "account.private_key_env",
            "must name an environment variable",
        ));
    }

    let tx = &config.transactions;
    if tx.max_gas == 0 {
        errors.push(ValidationError::new(
            "transactions.max_gas",
            "must be greater than zero",
        ));
    }
    if tx.max_gas_price_fri == 0 {
        errors.push(ValidationError::new(
            "transactions.max_gas_price_fri",
            "must be greater than zero",
        ));
    }
    if tx.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "transactions.poll_interval_ms",
            "must be greater than zero",
        ));
    }
    if tx.acceptance_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "transactions.acceptance_timeout_secs",
            "must be greater than zero",
        ));
    } else if tx.poll_interval_ms >= tx.acceptance_timeout_secs.saturating_mul(1000) {
        errors.push(ValidationError::new(
            "transactions.poll_interval_ms",
            "must be shorter than the acceptance timeout",
        ));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_felt(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if parse_felt(value).is_err() {
        errors.push(ValidationError::new(
            field,
            format!("'{}' is not a hex or decimal field element", value),
        ));
    }
}
