//! Key pairs and account handles.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables or generated
//! - Keys are never logged; `Debug` output redacts the secret scalar

use rand::{CryptoRng, RngCore};
use starknet::core::types::Felt;
use starknet::signers::{LocalWallet, SigningKey};

use crate::chain::types::{felt_hex, parse_felt, ChainError, ChainResult};

/// Stark curve key pair used for transaction signing.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    secret: Felt,
    public: Felt,
}

impl KeyPair {
    /// Build a key pair from a private scalar, deriving the public key.
    pub fn from_secret(secret: Felt) -> ChainResult<Self> {
        if secret == Felt::ZERO {
            return Err(ChainError::Wallet("private key must be non-zero".to_string()));
        }
        let public = SigningKey::from_secret_scalar(secret).verifying_key().scalar();
        Ok(Self { secret, public })
    }

    /// Parse a key pair from a hex-encoded private key (with or without 0x prefix).
    pub fn from_private_key(private_key_hex: &str) -> ChainResult<Self> {
        let trimmed = private_key_hex.trim();
        let key_hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let secret = Felt::from_hex(&format!("0x{}", key_hex))
            .map_err(|e| ChainError::Wallet(format!("Invalid private key format: {}", e)))?;
        Self::from_secret(secret)
    }

    /// Load a key pair from the named environment variable.
    pub fn from_env(var: &str) -> ChainResult<Self> {
        let private_key = std::env::var(var).map_err(|_| {
            ChainError::Wallet(format!("Environment variable {} not set", var))
        })?;
        Self::from_private_key(&private_key)
    }

    /// Generate a fresh key pair from a cryptographically secure RNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let secret = random_felt(rng);
            if let Ok(pair) = Self::from_secret(secret) {
                return pair;
            }
        }
    }

    pub fn public_key(&self) -> Felt {
        self.public
    }

    /// The private scalar. Callers are responsible for not leaking it.
    pub fn secret_scalar(&self) -> Felt {
        self.secret
    }

    /// Signer backed by this key pair.
    pub fn signer(&self) -> LocalWallet {
        LocalWallet::from_signing_key(SigningKey::from_secret_scalar(self.secret))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &felt_hex(&self.public))
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Draw a uniformly random scalar below 2^250, which is always inside the
/// Stark curve order.
pub fn random_felt<R: RngCore + CryptoRng>(rng: &mut R) -> Felt {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    bytes[0] &= 0x03;
    Felt::from_bytes_be(&bytes)
}

/// On-chain identity able to sign transactions.
///
/// Only constructible once address, key pair and chain are all known.
#[derive(Debug, Clone)]
pub struct AccountHandle {
    address: Felt,
    key_pair: KeyPair,
    chain_id: Felt,
}

impl AccountHandle {
    pub fn new(address: Felt, key_pair: KeyPair, chain_id: Felt) -> ChainResult<Self> {
        if address == Felt::ZERO {
            return Err(ChainError::Wallet("account address must be non-zero".to_string()));
        }
        Ok(Self {
            address,
            key_pair,
            chain_id,
        })
    }

    /// Build a handle from a textual address.
    pub fn from_address_str(address: &str, key_pair: KeyPair, chain_id: Felt) -> ChainResult<Self> {
        let address = parse_felt(address)
            .map_err(|e| ChainError::Wallet(format!("Invalid account address: {}", e)))?;
        Self::new(address, key_pair, chain_id)
    }

    pub fn address(&self) -> Felt {
        self.address
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn chain_id(&self) -> Felt {
        self.chain_id
    }
}
