//! Starknet RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to a JSON-RPC endpoint
//! - Query chain state (chain id, block number, balances, class and transaction status)
//! - Handle timeouts and network errors, mapping them to `ChainError`
//! - Build signing accounts from `AccountHandle`s

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use starknet::accounts::{AccountError, AccountFactoryError, ExecutionEncoding, SingleOwnerAccount};
use starknet::core::types::{
    BlockId, BlockTag, ContractClass, ExecutionResult, Felt, FunctionCall, StarknetError,
    TransactionExecutionStatus, TransactionStatus,
};
use starknet::core::utils::{cairo_short_string_to_felt, get_selector_from_name};
use starknet::providers::jsonrpc::{HttpTransport, JsonRpcClient};
use starknet::providers::{Provider, ProviderError};
use starknet::signers::LocalWallet;
use tokio::time::timeout;

use crate::chain::transaction::{poll_until_accepted, AcceptedTx, TxHandle};
use crate::chain::types::{
    felt_hex, parse_felt, ChainError, ChainResult, FeeBound, Finality, TxState, Uint256,
};
use crate::chain::wallet::{AccountHandle, KeyPair};
use crate::config::ClientConfig;
use crate::observability::metrics;

/// JSON-RPC provider used by the client.
pub type RpcProvider = JsonRpcClient<HttpTransport>;

/// Signing account bound to the client's provider.
pub type SignerAccount = SingleOwnerAccount<Arc<RpcProvider>, LocalWallet>;

/// Chain client facade.
///
/// Construction performs no network I/O; the first request does.
#[derive(Clone)]
pub struct ChainClient {
    provider: Arc<RpcProvider>,
    config: ClientConfig,
    timeout_duration: Duration,
    balance_token: Felt,
    gas_token: Felt,
}

impl ChainClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `config` - Validated client configuration
    pub fn new(config: ClientConfig) -> ChainResult<Self> {
        let url: url::Url = config.network.rpc_url.parse().map_err(|e| {
            ChainError::Config(format!("Invalid RPC URL '{}': {}", config.network.rpc_url, e))
        })?;
        let balance_token = parse_felt(&config.network.balance_token_address)
            .map_err(|e| ChainError::Config(format!("Invalid balance token address: {}", e)))?;
        let gas_token = parse_felt(&config.network.gas_token_address)
            .map_err(|e| ChainError::Config(format!("Invalid gas token address: {}", e)))?;

        let provider = Arc::new(JsonRpcClient::new(HttpTransport::new(url)));

        tracing::debug!(
            rpc_url = %config.network.rpc_url,
            timeout_secs = config.network.rpc_timeout_secs,
            "Chain client initialized"
        );

        Ok(Self {
            provider,
            timeout_duration: Duration::from_secs(config.network.rpc_timeout_secs),
            config,
            balance_token,
            gas_token,
        })
    }

    /// Run one node request under the RPC timeout.
    pub(crate) async fn request<T, E, F>(&self, method: &'static str, fut: F) -> ChainResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ChainError>,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(result)) => {
                metrics::record_rpc_request(method, "ok");
                Ok(result)
            }
            Ok(Err(e)) => {
                let err = e.into();
                metrics::record_rpc_request(method, "error");
                tracing::warn!(method, error = %err, "RPC request failed");
                Err(err)
            }
            Err(_) => {
                metrics::record_rpc_request(method, "timeout");
                tracing::warn!(method, "RPC request timed out");
                Err(ChainError::Timeout(self.config.network.rpc_timeout_secs))
            }
        }
    }

    /// Chain ID from config, or from the node when not configured.
    pub async fn chain_id(&self) -> ChainResult<Felt> {
        if let Some(name) = &self.config.network.chain_id {
            return cairo_short_string_to_felt(name)
                .map_err(|e| ChainError::Config(format!("Invalid chain id '{}': {}", name, e)));
        }
        self.request("starknet_chainId", self.provider.chain_id()).await
    }

    /// Get the latest block number.
    pub async fn block_number(&self) -> ChainResult<u64> {
        self.request("starknet_blockNumber", self.provider.block_number())
            .await
    }

    /// Check if the node is reachable and healthy.
    ///
    /// Returns true if we can query the block number.
    pub async fn is_healthy(&self) -> bool {
        self.block_number().await.is_ok()
    }

    /// Balance of an address in the configured balance token.
    pub async fn get_balance(&self, address: Felt) -> ChainResult<Uint256> {
        self.get_token_balance(self.balance_token, address).await
    }

    /// Balance of an address in the token that pays v3 transaction fees.
    pub async fn get_gas_token_balance(&self, address: Felt) -> ChainResult<Uint256> {
        self.get_token_balance(self.gas_token, address).await
    }

    /// ERC-20 `balanceOf` on any token contract.
    pub async fn get_token_balance(&self, token: Felt, address: Felt) -> ChainResult<Uint256> {
        let selector = selector("balanceOf")?;
        let result = self.call_raw(token, selector, vec![address]).await?;
        match result.as_slice() {
            [low, high, ..] => Uint256::from_felts(low, high),
            [low] => Uint256::from_felts(low, &Felt::ZERO),
            [] => Err(ChainError::Transport(
                "empty balanceOf response".to_string(),
            )),
        }
    }

    /// Read-only call against the latest block.
    pub async fn call_raw(
        &self,
        contract_address: Felt,
        entry_point_selector: Felt,
        calldata: Vec<Felt>,
    ) -> ChainResult<Vec<Felt>> {
        let call = FunctionCall {
            contract_address,
            entry_point_selector,
            calldata,
        };
        self.request(
            "starknet_call",
            self.provider.call(call, BlockId::Tag(BlockTag::Latest)),
        )
        .await
    }

    /// Whether the node knows a class hash.
    pub async fn is_class_declared(&self, class_hash: Felt) -> ChainResult<bool> {
        let lookup = async {
            match self
                .provider
                .get_class(BlockId::Tag(BlockTag::Latest), class_hash)
                .await
            {
                Ok(_) => Ok(true),
                Err(ProviderError::StarknetError(StarknetError::ClassHashNotFound)) => Ok(false),
                Err(e) => Err(e),
            }
        };
        self.request("starknet_getClass", lookup).await
    }

    /// Class hash of the contract deployed at `address`.
    pub async fn class_hash_at(&self, address: Felt) -> ChainResult<Felt> {
        self.request(
            "starknet_getClassHashAt",
            self.provider
                .get_class_hash_at(BlockId::Tag(BlockTag::Latest), address),
        )
        .await
    }

    /// Class definition of the contract deployed at `address`.
    pub async fn class_at(&self, address: Felt) -> ChainResult<ContractClass> {
        self.request(
            "starknet_getClassAt",
            self.provider
                .get_class_at(BlockId::Tag(BlockTag::Latest), address),
        )
        .await
    }

    /// Current state of a submitted transaction.
    pub async fn transaction_state(&self, tx_hash: Felt) -> ChainResult<TxState> {
        let lookup = async {
            match self.provider.get_transaction_status(tx_hash).await {
                Ok(status) => Ok(Some(status)),
                Err(ProviderError::StarknetError(StarknetError::TransactionHashNotFound)) => {
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        };
        let status = match self.request("starknet_getTransactionStatus", lookup).await? {
            Some(status) => status,
            None => return Ok(TxState::Pending),
        };

        let (finality, execution) = match status {
            TransactionStatus::Received => return Ok(TxState::Pending),
            TransactionStatus::Rejected => return Ok(TxState::Rejected),
            TransactionStatus::AcceptedOnL2(execution) => (Finality::AcceptedOnL2, execution),
            TransactionStatus::AcceptedOnL1(execution) => (Finality::AcceptedOnL1, execution),
        };

        match execution {
            TransactionExecutionStatus::Succeeded => Ok(TxState::Accepted(finality)),
            TransactionExecutionStatus::Reverted => {
                Ok(TxState::Reverted(self.revert_reason(tx_hash).await))
            }
        }
    }

    async fn revert_reason(&self, tx_hash: Felt) -> String {
        let receipt = self
            .request(
                "starknet_getTransactionReceipt",
                self.provider.get_transaction_receipt(tx_hash),
            )
            .await;
        match receipt {
            Ok(receipt) => match receipt.receipt.execution_result() {
                ExecutionResult::Reverted { reason } => reason.clone(),
                ExecutionResult::Succeeded => "execution reverted".to_string(),
            },
            Err(e) => format!("execution reverted (receipt unavailable: {})", e),
        }
    }

    /// Poll a transaction until it is accepted, reverted, rejected or the
    /// acceptance timeout elapses. Never returns a pending success.
    pub async fn wait_for_acceptance(&self, tx: &TxHandle) -> ChainResult<AcceptedTx> {
        let tx_config = &self.config.transactions;
        let tx_hash = tx.hash();
        tracing::info!(tx_hash = %felt_hex(&tx_hash), "Waiting for acceptance");

        let result = poll_until_accepted(
            tx_hash,
            Duration::from_millis(tx_config.poll_interval_ms),
            Duration::from_secs(tx_config.acceptance_timeout_secs),
            || self.transaction_state(tx_hash),
        )
        .await;

        match &result {
            Ok(accepted) => {
                metrics::record_transaction("accepted");
                tracing::info!(
                    tx_hash = %felt_hex(&tx_hash),
                    finality = %accepted.finality,
                    polls = accepted.polls,
                    "Transaction accepted"
                );
            }
            Err(e) => {
                metrics::record_transaction(match e {
                    ChainError::Reverted { .. } => "reverted",
                    ChainError::Rejected(_) => "rejected",
                    ChainError::AcceptanceTimeout { .. } => "timeout",
                    _ => "error",
                });
                tracing::error!(tx_hash = %felt_hex(&tx_hash), error = %e, "Transaction failed");
            }
        }
        result
    }

    /// Signing account for a handle, estimating against the pending block.
    pub fn account(&self, handle: &AccountHandle) -> SignerAccount {
        let mut account = SingleOwnerAccount::new(
            self.provider.clone(),
            handle.key_pair().signer(),
            handle.address(),
            handle.chain_id(),
            ExecutionEncoding::New,
        );
        account.set_block_id(BlockId::Tag(BlockTag::Pending));
        account
    }

    /// Account handle from the configured address and the key in the
    /// configured environment variable.
    pub async fn configured_account(&self) -> ChainResult<AccountHandle> {
        let address = self.config.account.address.as_deref().ok_or_else(|| {
            ChainError::Config("account.address is not configured".to_string())
        })?;
        let key_pair = KeyPair::from_env(&self.config.account.private_key_env)?;
        let chain_id = self.chain_id().await?;
        AccountHandle::from_address_str(address, key_pair, chain_id)
    }

    /// Configured fee bound for submitted transactions.
    pub fn fee_bound(&self) -> FeeBound {
        FeeBound {
            max_gas: self.config.transactions.max_gas,
            max_gas_price: u128::from(self.config.transactions.max_gas_price_fri),
        }
    }

    pub fn provider(&self) -> Arc<RpcProvider> {
        self.provider.clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("rpc_url", &self.config.network.rpc_url)
            .field("chain_id", &self.config.network.chain_id)
            .field("timeout_secs", &self.config.network.rpc_timeout_secs)
            .finish()
    }
}

pub(crate) fn selector(name: &str) -> ChainResult<Felt> {
    get_selector_from_name(name)
        .map_err(|_| ChainError::InvalidArgument(format!("function name '{}' is not ASCII", name)))
}

impl<S: std::error::Error> From<AccountError<S>> for ChainError {
    fn from(err: AccountError<S>) -> Self {
        match err {
            AccountError::Signing(e) => ChainError::Wallet(format!("Signing failed: {}", e)),
            AccountError::Provider(ProviderError::StarknetError(e)) => {
                ChainError::Rejected(e.to_string())
            }
            AccountError::Provider(e) => e.into(),
            other => ChainError::Other(other.to_string()),
        }
    }
}

impl<S: std::error::Error> From<AccountFactoryError<S>> for ChainError {
    fn from(err: AccountFactoryError<S>) -> Self {
        match err {
            AccountFactoryError::Signing(e) => ChainError::Wallet(format!("Signing failed: {}", e)),
            AccountFactoryError::Provider(ProviderError::StarknetError(e)) => {
                ChainError::Rejected(e.to_string())
            }
            AccountFactoryError::Provider(e) => e.into(),
            other => ChainError::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ClientConfig {
        let mut config = ClientConfig::default();
        // Nothing listens on the discard port.
        config.network.rpc_url = "http://127.0.0.1:9".to_string();
        config.network.rpc_timeout_secs = 5;
        config
    }

    #[test]
    fn test_client_creation_is_offline() {
        assert!(ChainClient::new(test_config()).is_ok());
    }

    #[test]
    fn test_invalid_rpc_url() {
        let mut config = test_config();
        config.network.rpc_url = "not a url".to_string();
        let err = ChainClient::new(config).unwrap_err();
        assert!(matches!(err, ChainError::Config(_)));
    }

    #[tokio::test]
    async fn test_chain_id_from_config() {
        let mut config = test_config();
        config.network.chain_id = Some("SN_SEPOLIA".to_string());
        let client = ChainClient::new(config).unwrap();

        let chain_id = client.chain_id().await.unwrap();
        assert_eq!(chain_id, cairo_short_string_to_felt("SN_SEPOLIA").unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        let client = ChainClient::new(test_config()).unwrap();
        let result = client.get_balance(Felt::from(0x1234u64)).await;
        assert!(matches!(result, Err(ChainError::Transport(_))));
        assert!(!client.is_healthy().await);
    }

    #[tokio::test]
    async fn test_configured_account_requires_address() {
        let client = ChainClient::new(test_config()).unwrap();
        let err = client.configured_account().await.unwrap_err();
        assert!(err.to_string().contains("account.address"));
    }

    #[test]
    fn test_fee_bound_from_config() {
        let mut config = test_config();
        config.transactions.max_gas = 20_000;
        config.transactions.max_gas_price_fri = 3;
        let client = ChainClient::new(config).unwrap();
        assert_eq!(
            client.fee_bound(),
            FeeBound {
                max_gas: 20_000,
                max_gas_price: 3
            }
        );
    }

    #[tokio::test]
    async fn test_status_and_class_lookups_map_transport_errors() {
        let client = ChainClient::new(test_config()).unwrap();
        let err = client.transaction_state(Felt::ONE).await.unwrap_err();
        assert!(matches!(err, ChainError::Transport(_)));
        let err = client.is_class_declared(Felt::ONE).await.unwrap_err();
        assert!(matches!(err, ChainError::Transport(_)));
    }
}
