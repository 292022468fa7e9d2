//! Contract declaration, deployment and interaction.

use std::path::Path;

use serde_json::Value as JsonValue;
use starknet::accounts::Account;
use starknet::contract::ContractFactory;
use starknet::core::types::{Call, ContractClass, Felt};

use crate::chain::abi::{ContractAbi, FunctionAbi, Mutability, Value};
use crate::chain::artifact::ContractArtifact;
use crate::chain::client::ChainClient;
use crate::chain::transaction::{AcceptedTx, TxHandle};
use crate::chain::types::{felt_hex, ChainError, ChainResult, FeeBound};
use crate::chain::wallet::AccountHandle;

/// A contract instance with the function table of the class it runs.
///
/// Only built from a class the node confirmed at the address, or from a
/// deployment this client just performed.
#[derive(Debug, Clone)]
pub struct DeployedContract {
    address: Felt,
    class_hash: Felt,
    abi: ContractAbi,
}

impl DeployedContract {
    pub(crate) fn new(address: Felt, class_hash: Felt, abi: ContractAbi) -> ChainResult<Self> {
        if address == Felt::ZERO {
            return Err(ChainError::InvalidArgument(
                "contract address must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            address,
            class_hash,
            abi,
        })
    }

    pub(crate) fn at(address: Felt, artifact: &ContractArtifact) -> ChainResult<Self> {
        Self::new(address, artifact.class_hash(), artifact.abi().clone())
    }

    pub fn address(&self) -> Felt {
        self.address
    }

    pub fn class_hash(&self) -> Felt {
        self.class_hash
    }

    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    /// Encode typed arguments for one of this contract's functions.
    pub fn encode_args(&self, function_name: &str, args: &[JsonValue]) -> ChainResult<Vec<Felt>> {
        let function = self.abi.function(function_name)?;
        self.abi.encode_args(function, args)
    }

    fn function(&self, name: &str, args: &[Felt]) -> ChainResult<&FunctionAbi> {
        let function = self.abi.function(name)?;
        self.abi.check_args(function, args)?;
        Ok(function)
    }
}

/// Outcome of a declare request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// The node already knew the class.
    AlreadyDeclared(Felt),
    Declared { class_hash: Felt, tx: AcceptedTx },
}

impl Declaration {
    pub fn class_hash(&self) -> Felt {
        match self {
            Declaration::AlreadyDeclared(class_hash) => *class_hash,
            Declaration::Declared { class_hash, .. } => *class_hash,
        }
    }
}

impl ChainClient {
    /// Attach to a deployed contract, checking that the node runs the
    /// artifact's class at `address`.
    pub async fn contract_at(
        &self,
        address: Felt,
        artifact: &ContractArtifact,
    ) -> ChainResult<DeployedContract> {
        let contract = DeployedContract::at(address, artifact)?;
        let actual = self.class_hash_at(address).await?;
        if actual != artifact.class_hash() {
            return Err(ChainError::ClassMismatch {
                address: felt_hex(&address),
                expected: felt_hex(&artifact.class_hash()),
                actual: felt_hex(&actual),
            });
        }
        Ok(contract)
    }

    /// Attach to a deployed contract using the ABI the node reports for it.
    pub async fn contract_from_node(&self, address: Felt) -> ChainResult<DeployedContract> {
        if address == Felt::ZERO {
            return Err(ChainError::InvalidArgument(
                "contract address must be non-zero".to_string(),
            ));
        }
        let class_hash = self.class_hash_at(address).await?;
        let abi = match self.class_at(address).await? {
            ContractClass::Sierra(class) => ContractAbi::from_value(&JsonValue::String(class.abi))
                .map_err(|e| ChainError::Node(format!("class at {}: {}", felt_hex(&address), e)))?,
            ContractClass::Legacy(_) => {
                return Err(ChainError::Other(format!(
                    "contract {} runs a Cairo 0 class, which is not supported",
                    felt_hex(&address)
                )))
            }
        };
        tracing::debug!(
            address = %felt_hex(&address),
            class_hash = %felt_hex(&class_hash),
            functions = abi.function_names().len(),
            "Contract ABI fetched from node"
        );
        DeployedContract::new(address, class_hash, abi)
    }

    /// Declare an artifact's class unless the node already has it.
    pub async fn declare(
        &self,
        account: &AccountHandle,
        artifact: &ContractArtifact,
    ) -> ChainResult<Declaration> {
        let class_hash = artifact.class_hash();
        if self.is_class_declared(class_hash).await? {
            tracing::info!(class_hash = %felt_hex(&class_hash), "Class already declared");
            return Ok(Declaration::AlreadyDeclared(class_hash));
        }

        let compiled_class_hash = artifact.compiled_class_hash().ok_or_else(|| {
            ChainError::ArtifactMissing(
                crate::chain::artifact::casm_sibling(artifact.path())
                    .unwrap_or_else(|| artifact.path().to_path_buf()),
            )
        })?;

        let fee = self.fee_bound();
        let signer = self.account(account);
        let declaration = signer
            .declare_v3(artifact.flattened_class(), compiled_class_hash)
            .gas(fee.max_gas)
            .gas_price(fee.max_gas_price);
        let result = self.request("declare", declaration.send()).await?;

        tracing::info!(
            class_hash = %felt_hex(&result.class_hash),
            tx_hash = %felt_hex(&result.transaction_hash),
            "Declare transaction submitted"
        );

        let tx = self
            .wait_for_acceptance(&TxHandle::new(result.transaction_hash))
            .await?;
        Ok(Declaration::Declared {
            class_hash: result.class_hash,
            tx,
        })
    }

    /// Load an artifact from disk and deploy it.
    ///
    /// The artifact is read and validated before any request is made, so a
    /// missing file fails with `ArtifactMissing` without touching the node.
    pub async fn deploy_contract(
        &self,
        account: &AccountHandle,
        artifact_path: impl AsRef<Path>,
        constructor_args: &[Felt],
        salt: Felt,
    ) -> ChainResult<DeployedContract> {
        let artifact = ContractArtifact::load(artifact_path)?;
        self.deploy_artifact(account, &artifact, constructor_args, salt)
            .await
    }

    /// Deploy a loaded artifact through the universal deployer, declaring
    /// the class first when a CASM hash is available.
    pub async fn deploy_artifact(
        &self,
        account: &AccountHandle,
        artifact: &ContractArtifact,
        constructor_args: &[Felt],
        salt: Felt,
    ) -> ChainResult<DeployedContract> {
        artifact.abi().check_constructor_args(constructor_args)?;

        if artifact.compiled_class_hash().is_some() {
            self.declare(account, artifact).await?;
        }

        let fee = self.fee_bound();
        let factory = ContractFactory::new(artifact.class_hash(), self.account(account));
        let deployment = factory
            .deploy_v3(constructor_args.to_vec(), salt, false)
            .gas(fee.max_gas)
            .gas_price(fee.max_gas_price);
        let address = deployment.deployed_address();
        let result = self.request("deploy", deployment.send()).await?;

        tracing::info!(
            contract = %artifact.name(),
            address = %felt_hex(&address),
            tx_hash = %felt_hex(&result.transaction_hash),
            "Deploy transaction submitted"
        );

        self.wait_for_acceptance(&TxHandle::new(result.transaction_hash))
            .await?;
        DeployedContract::at(address, artifact)
    }

    /// Read-only call; no transaction is created.
    pub async fn call(
        &self,
        contract: &DeployedContract,
        function_name: &str,
        args: &[Felt],
    ) -> ChainResult<Value> {
        let function = contract.function(function_name, args)?;
        if function.mutability != Mutability::View {
            tracing::debug!(function = function_name, "Calling external function read-only");
        }

        let data = self
            .call_raw(contract.address(), function.selector, args.to_vec())
            .await?;
        Ok(contract.abi().decode_outputs(function, &data))
    }

    /// Submit a state-mutating call as a v3 transaction bounded by `fee`.
    ///
    /// The returned handle is not durable until `wait_for_acceptance`
    /// succeeds on it.
    pub async fn invoke(
        &self,
        account: &AccountHandle,
        contract: &DeployedContract,
        function_name: &str,
        args: &[Felt],
        fee: FeeBound,
    ) -> ChainResult<TxHandle> {
        let function = contract.function(function_name, args)?;
        if function.mutability == Mutability::View {
            tracing::warn!(function = function_name, "Invoking a view function");
        }

        let signer = self.account(account);
        let execution = signer
            .execute_v3(vec![Call {
                to: contract.address(),
                selector: function.selector,
                calldata: args.to_vec(),
            }])
            .gas(fee.max_gas)
            .gas_price(fee.max_gas_price);
        let result = self.request("invoke", execution.send()).await?;

        tracing::info!(
            contract = %felt_hex(&contract.address()),
            function = function_name,
            tx_hash = %felt_hex(&result.transaction_hash),
            max_fee_fri = ?fee.max_fee(),
            "Invoke transaction submitted"
        );
        Ok(TxHandle::new(result.transaction_hash))
    }
}
