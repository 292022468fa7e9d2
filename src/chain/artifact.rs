//! Compiled contract artifact loading.
//!
//! Reads a Sierra `*.contract_class.json` produced by the contract build and,
//! when available, the matching CASM `*.compiled_contract_class.json` needed
//! to declare the class. Loading is purely local; nothing here touches the
//! network.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use starknet::core::types::contract::{CompiledClass, SierraClass};
use starknet::core::types::{Felt, FlattenedSierraClass};

use crate::chain::abi::ContractAbi;
use crate::chain::types::{ChainError, ChainResult};

const SIERRA_SUFFIX: &str = ".contract_class.json";
const CASM_SUFFIX: &str = ".compiled_contract_class.json";

/// A loaded, hashed contract class ready to declare or deploy.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    path: PathBuf,
    class: Arc<FlattenedSierraClass>,
    class_hash: Felt,
    compiled_class_hash: Option<Felt>,
    abi: ContractAbi,
}

impl ContractArtifact {
    /// Load a Sierra artifact, auto-discovering the CASM file next to it.
    pub fn load(path: impl AsRef<Path>) -> ChainResult<Self> {
        let path = path.as_ref();
        let casm = casm_sibling(path).filter(|p| p.is_file());
        Self::load_with_casm(path, casm.as_deref())
    }

    /// Load a Sierra artifact and an explicit CASM file.
    pub fn load_with_casm(path: impl AsRef<Path>, casm: Option<&Path>) -> ChainResult<Self> {
        let path = path.as_ref();
        let content = read_artifact(path)?;

        let sierra: SierraClass = serde_json::from_str(&content).map_err(|e| malformed(path, e))?;
        let raw: serde_json::Value = serde_json::from_str(&content).map_err(|e| malformed(path, e))?;
        let abi = ContractAbi::from_value(raw.get("abi").unwrap_or(&serde_json::Value::Null))
            .map_err(|e| malformed(path, e))?;

        let class = sierra.flatten().map_err(|e| malformed(path, e))?;
        let class_hash = class.class_hash();

        let compiled_class_hash = match casm {
            Some(casm_path) => Some(load_compiled_class_hash(casm_path)?),
            None => None,
        };

        tracing::debug!(
            path = %path.display(),
            class_hash = %crate::chain::types::felt_hex(&class_hash),
            functions = abi.function_names().len(),
            has_casm = compiled_class_hash.is_some(),
            "Contract artifact loaded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            class: Arc::new(class),
            class_hash,
            compiled_class_hash,
            abi,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn class_hash(&self) -> Felt {
        self.class_hash
    }

    /// CASM class hash, required for declaring.
    pub fn compiled_class_hash(&self) -> Option<Felt> {
        self.compiled_class_hash
    }

    pub fn flattened_class(&self) -> Arc<FlattenedSierraClass> {
        self.class.clone()
    }

    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    /// Short contract name derived from the file name.
    pub fn name(&self) -> String {
        let file = self
            .path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        file.strip_suffix(SIERRA_SUFFIX)
            .map(str::to_string)
            .unwrap_or(file)
    }
}

/// `Foo.contract_class.json` → `Foo.compiled_contract_class.json`.
pub fn casm_sibling(path: &Path) -> Option<PathBuf> {
    let file = path.file_name()?.to_str()?;
    let stem = file.strip_suffix(SIERRA_SUFFIX)?;
    Some(path.with_file_name(format!("{}{}", stem, CASM_SUFFIX)))
}

fn read_artifact(path: &Path) -> ChainResult<String> {
    if !path.is_file() {
        return Err(ChainError::ArtifactMissing(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ChainError::ArtifactMissing(path.to_path_buf()),
        _ => malformed(path, e),
    })
}

fn load_compiled_class_hash(path: &Path) -> ChainResult<Felt> {
    let content = read_artifact(path)?;
    let compiled: CompiledClass = serde_json::from_str(&content).map_err(|e| malformed(path, e))?;
    compiled.class_hash().map_err(|e| malformed(path, e))
}

fn malformed(path: &Path, reason: impl std::fmt::Display) -> ChainError {
    ChainError::ArtifactMalformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
