//! Chain-specific types and error definitions.

use std::path::PathBuf;

use starknet::core::types::Felt;
use starknet::core::utils::cairo_short_string_to_felt;
use starknet::providers::ProviderError;
use thiserror::Error;

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Connection failure or malformed response from the node.
    #[error("Transport error: {0}")]
    Transport(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node answered with a protocol-level error.
    #[error("Node error: {0}")]
    Node(String),

    /// Contract artifact file does not exist.
    #[error("Contract artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// Contract artifact exists but cannot be used.
    #[error("Malformed contract artifact {}: {reason}", path.display())]
    ArtifactMalformed { path: PathBuf, reason: String },

    /// The node refused the transaction.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// Transaction was included but its execution reverted.
    #[error("Transaction {tx_hash} reverted: {reason}")]
    Reverted { tx_hash: String, reason: String },

    /// Transaction was not accepted within the configured window.
    #[error("Transaction {tx_hash} not accepted after {secs} seconds")]
    AcceptanceTimeout { tx_hash: String, secs: u64 },

    /// Arguments do not match the function's ABI.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The class deployed at an address is not the one the caller expected.
    #[error("Contract {address} runs class {actual}, not {expected}")]
    ClassMismatch {
        address: String,
        expected: String,
        actual: String,
    },

    /// Function is not part of the contract ABI.
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    /// Invalid private key or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Client configuration is unusable for the requested operation.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

impl From<ProviderError> for ChainError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::StarknetError(e) => ChainError::Node(e.to_string()),
            ProviderError::RateLimited => ChainError::Transport("rate limited by node".to_string()),
            other => ChainError::Transport(other.to_string()),
        }
    }
}

/// Observed state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxState {
    /// Not yet known to the node, or received but not executed.
    Pending,
    /// Accepted with a successful execution.
    Accepted(Finality),
    /// Included, but execution reverted.
    Reverted(String),
    /// Refused by the node; will never be included.
    Rejected,
}

/// Layer at which an accepted transaction is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finality {
    AcceptedOnL2,
    AcceptedOnL1,
}

impl std::fmt::Display for Finality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finality::AcceptedOnL2 => write!(f, "ACCEPTED_ON_L2"),
            Finality::AcceptedOnL1 => write!(f, "ACCEPTED_ON_L1"),
        }
    }
}

/// Unsigned 256-bit amount as Cairo encodes it: two 128-bit limbs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Uint256 {
    pub low: u128,
    pub high: u128,
}

impl Uint256 {
    pub fn from_felts(low: &Felt, high: &Felt) -> ChainResult<Self> {
        Ok(Self {
            low: felt_to_u128(low)?,
            high: felt_to_u128(high)?,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.low == 0 && self.high == 0
    }
}

impl Uint256 {
    /// Calldata encoding: `[low, high]`.
    pub fn to_felts(&self) -> [Felt; 2] {
        [Felt::from(self.low), Felt::from(self.high)]
    }

    /// Decimal rendering scaled down by `decimals` places, e.g. wei to ETH.
    pub fn format_units(&self, decimals: usize) -> String {
        let digits = self.to_string();
        if decimals == 0 {
            return digits;
        }
        let padded = format!("{:0>width$}", digits, width = decimals + 1);
        let (int, frac) = padded.split_at(padded.len() - decimals);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            format!("{}.0", int)
        } else {
            format!("{}.{}", int, frac)
        }
    }
}

impl std::str::FromStr for Uint256 {
    type Err = ChainError;

    /// Parse `0x`-prefixed hex or decimal, up to 2^256 - 1.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let invalid = || ChainError::InvalidArgument(format!("'{}' is not a u256", value));

        if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
            if hex.is_empty() || hex.len() > 64 {
                return Err(invalid());
            }
            let split = hex.len().saturating_sub(32);
            let (high, low) = hex.split_at(split);
            let low = u128::from_str_radix(low, 16).map_err(|_| invalid())?;
            let high = if high.is_empty() {
                0
            } else {
                u128::from_str_radix(high, 16).map_err(|_| invalid())?
            };
            return Ok(Self { low, high });
        }

        if value.is_empty() {
            return Err(invalid());
        }
        // Four 64-bit limbs, least significant first.
        let mut limbs = [0u64; 4];
        for c in value.chars() {
            let mut carry = u128::from(c.to_digit(10).ok_or_else(invalid)?);
            for limb in limbs.iter_mut() {
                let cur = u128::from(*limb) * 10 + carry;
                *limb = cur as u64;
                carry = cur >> 64;
            }
            if carry != 0 {
                return Err(invalid());
            }
        }
        Ok(Self {
            low: (u128::from(limbs[1]) << 64) | u128::from(limbs[0]),
            high: (u128::from(limbs[3]) << 64) | u128::from(limbs[2]),
        })
    }
}

/// Upper bound on what a transaction may spend: gas units times price per
/// unit (in fri).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBound {
    pub max_gas: u64,
    pub max_gas_price: u128,
}

impl FeeBound {
    /// Largest total fee this bound allows, if it fits in 128 bits.
    pub fn max_fee(&self) -> Option<u128> {
        u128::from(self.max_gas).checked_mul(self.max_gas_price)
    }
}

impl From<u128> for Uint256 {
    fn from(low: u128) -> Self {
        Self { low, high: 0 }
    }
}

impl PartialOrd for Uint256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Uint256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.high, self.low).cmp(&(other.high, other.low))
    }
}

impl std::fmt::Display for Uint256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.high == 0 {
            return write!(f, "{}", self.low);
        }
        // Long division by 10 over four 64-bit limbs, most significant first.
        let mut limbs = [
            (self.high >> 64) as u64,
            self.high as u64,
            (self.low >> 64) as u64,
            self.low as u64,
        ];
        let mut digits = Vec::new();
        while limbs.iter().any(|l| *l != 0) {
            let mut rem: u128 = 0;
            for limb in limbs.iter_mut() {
                let cur = (rem << 64) | u128::from(*limb);
                *limb = (cur / 10) as u64;
                rem = cur % 10;
            }
            digits.push(b'0' + rem as u8);
        }
        digits.reverse();
        f.write_str(std::str::from_utf8(&digits).map_err(|_| std::fmt::Error)?)
    }
}

/// Parse a field element from `0x`-prefixed hex or plain decimal.
pub fn parse_felt(value: &str) -> ChainResult<Felt> {
    let value = value.trim();
    let parsed = if value.starts_with("0x") || value.starts_with("0X") {
        Felt::from_hex(value)
    } else {
        Felt::from_dec_str(value)
    };
    parsed.map_err(|e| ChainError::InvalidArgument(format!("'{}' is not a felt: {}", value, e)))
}

/// Parse one calldata argument: a felt, or a `'quoted'` Cairo short string.
pub fn parse_arg(value: &str) -> ChainResult<Felt> {
    let trimmed = value.trim();
    if let Some(text) = trimmed
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return cairo_short_string_to_felt(text).map_err(|e| {
            ChainError::InvalidArgument(format!("'{}' is not a short string: {}", text, e))
        });
    }
    parse_felt(trimmed)
}

/// Full-width hex rendering used in logs and console output.
pub fn felt_hex(felt: &Felt) -> String {
    let mut out = String::with_capacity(66);
    out.push_str("0x");
    for byte in felt.to_bytes_be() {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Narrow a felt to `u128`, failing if the high bits are set.
pub fn felt_to_u128(felt: &Felt) -> ChainResult<u128> {
    let bytes = felt.to_bytes_be();
    if bytes[..16].iter().any(|b| *b != 0) {
        return Err(ChainError::Other(format!(
            "value {} does not fit in 128 bits",
            felt_hex(felt)
        )));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&bytes[16..]);
    Ok(u128::from_be_bytes(low))
}
