//! Transaction handles and acceptance monitoring.
//!
//! # Responsibilities
//! - Represent submitted transactions by hash
//! - Poll status at a fixed interval until a terminal state
//! - Surface reverts, rejections and timeouts as errors

use std::future::Future;
use std::time::Duration;

use starknet::core::types::Felt;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::chain::types::{felt_hex, ChainError, ChainResult, Finality, TxState};

/// A submitted, not yet confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHandle {
    hash: Felt,
}

impl TxHandle {
    pub fn new(hash: Felt) -> Self {
        Self { hash }
    }

    pub fn hash(&self) -> Felt {
        self.hash
    }
}

impl std::fmt::Display for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&felt_hex(&self.hash))
    }
}

/// A transaction the network has accepted with a successful execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedTx {
    pub hash: Felt,
    pub finality: Finality,
    /// Number of status queries it took.
    pub polls: u32,
}

/// Poll `fetch` until the transaction reaches a terminal state.
///
/// # Arguments
/// * `tx_hash` - Transaction being monitored
/// * `poll_interval` - Delay between status queries
/// * `limit` - Maximum time to wait for acceptance
/// * `fetch` - Produces the current state on each poll
pub async fn poll_until_accepted<F, Fut>(
    tx_hash: Felt,
    poll_interval: Duration,
    limit: Duration,
    mut fetch: F,
) -> ChainResult<AcceptedTx>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ChainResult<TxState>>,
{
    let hash_hex = felt_hex(&tx_hash);

    let result = timeout(limit, async {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = 0u32;

        loop {
            ticker.tick().await;
            polls += 1;

            match fetch().await? {
                TxState::Pending => {
                    tracing::debug!(tx_hash = %hash_hex, polls, "Transaction pending");
                }
                TxState::Accepted(finality) => {
                    return Ok(AcceptedTx {
                        hash: tx_hash,
                        finality,
                        polls,
                    });
                }
                TxState::Reverted(reason) => {
                    return Err(ChainError::Reverted {
                        tx_hash: hash_hex.clone(),
                        reason,
                    });
                }
                TxState::Rejected => {
                    return Err(ChainError::Rejected(format!(
                        "transaction {} rejected by the node",
                        hash_hex
                    )));
                }
            }
        }
    })
    .await;

    match result {
        Ok(outcome) => outcome,
        Err(_) => Err(ChainError::AcceptanceTimeout {
            tx_hash: hash_hex,
            secs: limit.as_secs(),
        }),
    }
}
