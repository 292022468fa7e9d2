//! stark-client command line.
//!
//! Thin front end over the chain facade: each subcommand loads the config,
//! performs one operation and prints addresses, hashes or balances.
//!
//! ```text
//! stark-client --config client.toml balance
//! stark-client account new --key-out account.key
//! stark-client deploy target/dev/pm_PredictionMarket.contract_class.json
//! stark-client functions target/dev/pm_PredictionMarket.contract_class.json
//! stark-client call <artifact> --address 0x.. --function get_market 0
//! stark-client invoke <artifact> --address 0x.. --function create_market \
//!     "Will ETH reach 5000?" crypto 1735689599 1000 true
//! ```
//!
//! Arguments are encoded from the function's ABI: strings for felts,
//! integers and `ByteArray`, JSON for arrays, structs and enums. `--raw`
//! passes them through as felts instead.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use starknet::core::types::Felt;

use stark_client::chain::abi::Mutability;
use stark_client::chain::types::{felt_hex, parse_arg, parse_felt};
use stark_client::chain::wallet::random_felt;
use stark_client::chain::{
    parse_arg_text, ChainClient, ContractArtifact, DeployedContract, FeeBound, KeyPair, TxHandle,
};
use stark_client::config::load_config;
use stark_client::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "stark-client")]
#[command(about = "Check balances, deploy accounts and contracts, call and invoke functions", long_about = None)]
struct Cli {
    /// TOML config file; defaults and environment overrides apply without one.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check node connectivity
    Status,
    /// Balance token holdings of an address (defaults to the configured account)
    Balance {
        #[arg(long)]
        address: Option<String>,
    },
    /// Generate and deploy accounts
    #[command(subcommand)]
    Account(AccountCommand),
    /// Declare a contract class
    Declare {
        artifact: PathBuf,
        /// CASM artifact; looked up next to the Sierra file when omitted
        #[arg(long)]
        casm: Option<PathBuf>,
    },
    /// Deploy a contract from a compiled artifact
    Deploy {
        artifact: PathBuf,
        #[arg(long)]
        casm: Option<PathBuf>,
        #[arg(long)]
        salt: Option<String>,
        /// Pass constructor arguments as raw felts
        #[arg(long)]
        raw: bool,
        /// Constructor arguments
        args: Vec<String>,
    },
    /// List a contract's functions
    Functions {
        /// Compiled artifact; the ABI is fetched from the node when omitted
        artifact: Option<PathBuf>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Read-only function call
    Call {
        artifact: PathBuf,
        #[arg(long)]
        address: String,
        #[arg(long)]
        function: String,
        /// Pass arguments as raw felts
        #[arg(long)]
        raw: bool,
        args: Vec<String>,
    },
    /// State-mutating function call
    Invoke {
        artifact: PathBuf,
        #[arg(long)]
        address: String,
        #[arg(long)]
        function: String,
        /// Overrides transactions.max_gas
        #[arg(long)]
        max_gas: Option<u64>,
        /// Overrides transactions.max_gas_price_fri
        #[arg(long)]
        max_gas_price: Option<u128>,
        /// Print the hash without waiting for acceptance
        #[arg(long)]
        no_wait: bool,
        /// Pass arguments as raw felts
        #[arg(long)]
        raw: bool,
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Generate a key pair and print the address to fund
    New {
        /// Write the private key to this file instead of stdout
        #[arg(long)]
        key_out: Option<PathBuf>,
    },
    /// Deploy a funded account using the key from the configured env var
    Deploy {
        #[arg(long)]
        salt: String,
    },
    /// Generate and deploy in one step (address must be pre-funded)
    Create {
        #[arg(long)]
        key_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("Warning: logging not initialized: {}", e);
    }

    tracing::debug!(
        rpc_url = %config.network.rpc_url,
        max_gas = config.transactions.max_gas,
        max_gas_price_fri = config.transactions.max_gas_price_fri,
        "Configuration loaded"
    );

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    config: stark_client::ClientConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ChainClient::new(config)?;

    match command {
        Commands::Status => {
            let block = client.block_number().await?;
            let chain_id = client.chain_id().await?;
            println!("Chain ID: {}", felt_hex(&chain_id));
            println!("Latest block: {}", block);
        }
        Commands::Balance { address } => {
            let address = match address {
                Some(address) => parse_felt(&address)?,
                None => configured_address(&client)?,
            };
            let balance = client.get_balance(address).await?;
            let network = &client.config().network;
            println!(
                "Balance of {}: {} wei ({} {})",
                felt_hex(&address),
                balance,
                balance.format_units(usize::from(network.balance_token_decimals)),
                network.balance_token_symbol
            );
        }
        Commands::Account(AccountCommand::New { key_out }) => {
            let pending = client.prepare_account(&mut OsRng)?;
            println!("Address: {}", felt_hex(&pending.address()));
            println!("Public key: {}", felt_hex(&pending.key_pair().public_key()));
            println!("Salt: {}", felt_hex(&pending.salt()));
            emit_private_key(pending.key_pair(), key_out.as_deref())?;
            println!("Fund the address, then run `account deploy --salt <salt>`");
        }
        Commands::Account(AccountCommand::Deploy { salt }) => {
            let key_pair = KeyPair::from_env(&client.config().account.private_key_env)?;
            let pending = client.restore_account(key_pair, parse_felt(&salt)?)?;
            let (handle, accepted) = client.deploy_account(&pending).await?;
            println!("Account deployed: {}", felt_hex(&handle.address()));
            println!("Transaction: {} ({})", felt_hex(&accepted.hash), accepted.finality);
        }
        Commands::Account(AccountCommand::Create { key_out }) => {
            let (key_pair, handle) = client.create_account(&mut OsRng).await?;
            println!("Account deployed: {}", felt_hex(&handle.address()));
            emit_private_key(&key_pair, key_out.as_deref())?;
        }
        Commands::Declare { artifact, casm } => {
            let artifact = load_artifact(&artifact, casm.as_deref())?;
            let account = client.configured_account().await?;
            let declaration = client.declare(&account, &artifact).await?;
            println!("Class hash: {}", felt_hex(&declaration.class_hash()));
        }
        Commands::Deploy {
            artifact,
            casm,
            salt,
            raw,
            args,
        } => {
            let artifact = load_artifact(&artifact, casm.as_deref())?;
            let args = if raw {
                parse_raw_args(&args)?
            } else {
                artifact.abi().encode_constructor_args(&parse_typed_args(&args)?)?
            };
            let salt = match salt {
                Some(salt) => parse_felt(&salt)?,
                None => random_felt(&mut OsRng),
            };
            let account = client.configured_account().await?;
            let contract = client
                .deploy_artifact(&account, &artifact, &args, salt)
                .await?;
            println!("Contract deployed: {}", felt_hex(&contract.address()));
            println!("Class hash: {}", felt_hex(&contract.class_hash()));
        }
        Commands::Functions { artifact, address } => {
            let contract = match (artifact, address) {
                (Some(artifact), Some(address)) => attach(&client, &artifact, &address).await?,
                (None, Some(address)) => client.contract_from_node(parse_felt(&address)?).await?,
                (Some(artifact), None) => {
                    let artifact = ContractArtifact::load(artifact)?;
                    print_functions(artifact.abi().functions());
                    return Ok(());
                }
                (None, None) => return Err("give an artifact, an --address, or both".into()),
            };
            print_functions(contract.abi().functions());
        }
        Commands::Call {
            artifact,
            address,
            function,
            raw,
            args,
        } => {
            let contract = attach(&client, &artifact, &address).await?;
            let calldata = encode_call_args(&contract, &function, &args, raw)?;
            let value = client.call(&contract, &function, &calldata).await?;
            println!("{}", serde_json::to_string_pretty(&value.to_json())?);
        }
        Commands::Invoke {
            artifact,
            address,
            function,
            max_gas,
            max_gas_price,
            no_wait,
            raw,
            args,
        } => {
            let contract = attach(&client, &artifact, &address).await?;
            let calldata = encode_call_args(&contract, &function, &args, raw)?;
            let defaults = client.fee_bound();
            let fee = FeeBound {
                max_gas: max_gas.unwrap_or(defaults.max_gas),
                max_gas_price: max_gas_price.unwrap_or(defaults.max_gas_price),
            };
            let account = client.configured_account().await?;
            let tx: TxHandle = client
                .invoke(&account, &contract, &function, &calldata, fee)
                .await?;
            println!("Transaction: {}", tx);
            if !no_wait {
                let accepted = client.wait_for_acceptance(&tx).await?;
                println!("Status: {}", accepted.finality);
            }
        }
    }

    Ok(())
}

fn configured_address(client: &ChainClient) -> Result<Felt, Box<dyn std::error::Error>> {
    let address = client
        .config()
        .account
        .address
        .as_deref()
        .ok_or("no --address given and account.address is not configured")?;
    Ok(parse_felt(address)?)
}

fn load_artifact(path: &Path, casm: Option<&Path>) -> stark_client::ChainResult<ContractArtifact> {
    match casm {
        Some(casm) => ContractArtifact::load_with_casm(path, Some(casm)),
        None => ContractArtifact::load(path),
    }
}

async fn attach(
    client: &ChainClient,
    artifact: &Path,
    address: &str,
) -> stark_client::ChainResult<DeployedContract> {
    let artifact = ContractArtifact::load(artifact)?;
    client.contract_at(parse_felt(address)?, &artifact).await
}

fn encode_call_args(
    contract: &DeployedContract,
    function: &str,
    args: &[String],
    raw: bool,
) -> stark_client::ChainResult<Vec<Felt>> {
    if raw {
        return parse_raw_args(args);
    }
    contract.encode_args(function, &parse_typed_args(args)?)
}

fn parse_raw_args(args: &[String]) -> stark_client::ChainResult<Vec<Felt>> {
    args.iter().map(|arg| parse_arg(arg)).collect()
}

fn parse_typed_args(args: &[String]) -> stark_client::ChainResult<Vec<serde_json::Value>> {
    args.iter().map(|arg| parse_arg_text(arg)).collect()
}

fn print_functions(functions: Vec<&stark_client::chain::FunctionAbi>) {
    println!("Available functions:");
    for function in functions {
        let kind = match function.mutability {
            Mutability::View => "view",
            Mutability::External => "external",
        };
        println!("  {} [{}]", function.signature(), kind);
    }
}

/// Private keys go to a file when asked; otherwise they are printed once so
/// the user can store them.
fn emit_private_key(key_pair: &KeyPair, key_out: Option<&Path>) -> std::io::Result<()> {
    let secret = felt_hex(&key_pair.secret_scalar());
    match key_out {
        Some(path) => {
            std::fs::write(path, format!("{}\n", secret))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
            }
            println!("Private key written to {}", path.display());
        }
        None => println!("Private key: {}", secret),
    }
    Ok(())
}
