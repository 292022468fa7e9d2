//! Account generation and deployment.
//!
//! A new account is first prepared offline (key pair, salt, counterfactual
//! address) so the address can be funded, then deployed with the configured
//! base account class.

use rand::{CryptoRng, RngCore};
use starknet::accounts::{AccountFactory, OpenZeppelinAccountFactory};
use starknet::core::types::Felt;
use starknet::core::utils::get_contract_address;

use crate::chain::client::ChainClient;
use crate::chain::transaction::{AcceptedTx, TxHandle};
use crate::chain::types::{felt_hex, parse_felt, ChainError, ChainResult};
use crate::chain::wallet::{random_felt, AccountHandle, KeyPair};

/// An account whose address is known but which may not be deployed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAccount {
    key_pair: KeyPair,
    salt: Felt,
    class_hash: Felt,
    address: Felt,
}

impl PendingAccount {
    /// Compute the counterfactual address for a key pair, salt and class.
    ///
    /// The account constructor takes the public key as its only argument and
    /// the deployment is not routed through a deployer contract.
    pub fn new(key_pair: KeyPair, salt: Felt, class_hash: Felt) -> Self {
        let address = get_contract_address(salt, class_hash, &[key_pair.public_key()], Felt::ZERO);
        Self {
            key_pair,
            salt,
            class_hash,
            address,
        }
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn salt(&self) -> Felt {
        self.salt
    }

    pub fn class_hash(&self) -> Felt {
        self.class_hash
    }

    pub fn address(&self) -> Felt {
        self.address
    }
}

impl ChainClient {
    /// Generate a key pair and salt and compute the account address.
    /// Performs no network I/O.
    pub fn prepare_account<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> ChainResult<PendingAccount> {
        let class_hash = self.base_account_class_hash()?;
        let key_pair = KeyPair::generate(rng);
        let salt = random_felt(rng);
        let pending = PendingAccount::new(key_pair, salt, class_hash);

        tracing::info!(
            address = %felt_hex(&pending.address()),
            public_key = %felt_hex(&pending.key_pair().public_key()),
            "Account prepared"
        );
        Ok(pending)
    }

    /// Rebuild a pending account from a known key and salt.
    pub fn restore_account(&self, key_pair: KeyPair, salt: Felt) -> ChainResult<PendingAccount> {
        Ok(PendingAccount::new(key_pair, salt, self.base_account_class_hash()?))
    }

    /// Deploy a prepared account and wait for acceptance.
    pub async fn deploy_account(
        &self,
        pending: &PendingAccount,
    ) -> ChainResult<(AccountHandle, AcceptedTx)> {
        let chain_id = self.chain_id().await?;

        match self.get_gas_token_balance(pending.address()).await {
            Ok(balance) if balance.is_zero() => tracing::warn!(
                address = %felt_hex(&pending.address()),
                "Account address holds no STRK for v3 fees; deployment will likely fail"
            ),
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "Could not check account funding"),
        }

        let factory = OpenZeppelinAccountFactory::new(
            pending.class_hash(),
            chain_id,
            pending.key_pair().signer(),
            self.provider(),
        )
        .await
        .map_err(|e| ChainError::Wallet(format!("Account factory setup failed: {}", e)))?;

        let fee = self.fee_bound();
        let deployment = factory
            .deploy_v3(pending.salt())
            .gas(fee.max_gas)
            .gas_price(fee.max_gas_price);
        if deployment.address() != pending.address() {
            return Err(ChainError::Other(format!(
                "factory address {} differs from computed address {}",
                felt_hex(&deployment.address()),
                felt_hex(&pending.address())
            )));
        }

        let result = self.request("deploy_account", deployment.send()).await?;
        tracing::info!(
            address = %felt_hex(&result.contract_address),
            tx_hash = %felt_hex(&result.transaction_hash),
            "Account deployment submitted"
        );

        let accepted = self
            .wait_for_acceptance(&TxHandle::new(result.transaction_hash))
            .await?;
        let handle = AccountHandle::new(pending.address(), pending.key_pair().clone(), chain_id)?;
        Ok((handle, accepted))
    }

    /// Generate, deploy and wait for a brand new account.
    ///
    /// The address must already hold enough fee token; use
    /// `prepare_account` + `deploy_account` to fund it in between.
    pub async fn create_account<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> ChainResult<(KeyPair, AccountHandle)> {
        let pending = self.prepare_account(rng)?;
        let (handle, _) = self.deploy_account(&pending).await?;
        Ok((pending.key_pair().clone(), handle))
    }

    fn base_account_class_hash(&self) -> ChainResult<Felt> {
        parse_felt(&self.config().account.class_hash)
            .map_err(|e| ChainError::Config(format!("Invalid account class hash: {}", e)))
    }
}
