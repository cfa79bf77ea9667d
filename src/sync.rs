//! Peer synchronization and mining orchestration
//!
//! Every node is both HTTP client and server: peers are polled synchronously
//! over the same surface this node serves. Sync is best-effort, one
//! round-trip per peer in registry order, and a peer that fails at the
//! transport level is deregistered on the spot.

use crate::block::Block;
use crate::blockchain::Blockchain;
use crate::error::ChainError;
use crate::registry::NodeRegistry;
use crate::transaction::Transaction;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// HTTP client side of the peer surface.
#[derive(Debug, Clone)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl Default for PeerClient {
    fn default() -> Self {
        PeerClient::new()
    }
}

impl PeerClient {
    pub fn new() -> Self {
        // The request timeout doubles as the deadlock breaker for mutually
        // registered nodes mining at the same time: a peer that cannot answer
        // because it is mid-cycle resolves as unreachable instead of hanging
        // the poll forever.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("default reqwest client");
        PeerClient { http }
    }

    pub async fn fetch_chain(&self, base_url: &str) -> Result<Vec<Block>, ChainError> {
        self.get_json(base_url, "/chain").await
    }

    pub async fn fetch_pending(&self, base_url: &str) -> Result<Vec<Transaction>, ChainError> {
        self.get_json(base_url, "/pending-transactions").await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
    ) -> Result<T, ChainError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::PeerUnreachable(format!("{}: {}", base_url, e)))?
            .error_for_status()
            .map_err(|e| ChainError::PeerUnreachable(format!("{}: {}", base_url, e)))?;
        response
            .json::<T>()
            .await
            .map_err(|e| ChainError::PeerUnreachable(format!("{}: {}", base_url, e)))
    }
}

/// Longest-valid-chain synchronization.
///
/// Scans every registered peer, keeps the single best candidate (strictly
/// longer than both the local chain and any earlier candidate, and fully
/// valid), and commits it after the scan. Strict `>` means the first peer to
/// present a given winning length beats later peers at the same length.
/// Unreachable peers are deregistered and the scan continues. When neither a
/// candidate nor a local chain exists, a genesis block is synthesized.
pub async fn replace_chain(
    ledger: &mut Blockchain,
    registry: &NodeRegistry,
    client: &PeerClient,
    own_url: &str,
) {
    let mut best: Option<Vec<Block>> = None;

    for peer in registry.list_without(own_url) {
        match client.fetch_chain(&peer).await {
            Ok(candidate) => {
                let benchmark = best.as_ref().map_or(ledger.chain.len(), Vec::len);
                if candidate.len() > benchmark && ledger.is_chain_valid(&candidate) {
                    best = Some(candidate);
                }
            }
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "peer unreachable, deregistering");
                if let Err(e) = registry.remove(&peer) {
                    tracing::warn!(peer = %peer, error = %e, "failed to deregister peer");
                }
            }
        }
    }

    if let Some(chain) = best {
        tracing::info!(
            old_len = ledger.chain.len(),
            new_len = chain.len(),
            "adopting longer peer chain"
        );
        ledger.adopt_chain(chain);
    }

    ledger.ensure_genesis();
}

/// Merges the local mempool with every reachable peer's, drops system-issued
/// transactions (rewards are minted at block assembly, never relayed), and
/// sorts by timestamp. Signature re-verification of peer-supplied
/// transactions happens in the reconciliation pass that consumes this set.
pub async fn collect_pending(
    ledger: &Blockchain,
    registry: &NodeRegistry,
    client: &PeerClient,
    own_url: &str,
) -> Vec<Transaction> {
    let mut merged = ledger.pending_transactions.clone();

    for peer in registry.list_without(own_url) {
        match client.fetch_pending(&peer).await {
            Ok(txs) => merged.extend(txs),
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "peer unreachable, deregistering");
                if let Err(e) = registry.remove(&peer) {
                    tracing::warn!(peer = %peer, error = %e, "failed to deregister peer");
                }
            }
        }
    }

    merged.retain(|tx| !tx.is_reward());
    merged.sort_by_key(|tx| tx.timestamp);
    merged
}

/// One full mining cycle.
///
/// Reconciles the merged mempool, solves proof-of-work, then re-syncs with
/// peers before committing: if the chain tip moved during the solve, another
/// node won the race and the local block is discarded with
/// `StaleMiningResult`. The caller decides whether to start a fresh cycle.
///
/// Proof-of-work is CPU-bound and blocks the calling context for a
/// difficulty-dependent duration. Callers must hold exclusive access to the
/// ledger for the whole cycle; the race check covers concurrent mining on
/// *other* nodes, not unsynchronized local mutation.
pub async fn mine_pending_transactions(
    ledger: &mut Blockchain,
    registry: &NodeRegistry,
    client: &PeerClient,
    own_url: &str,
    reward_address: &str,
) -> Result<Block, ChainError> {
    ledger.ensure_genesis();

    let candidates = collect_pending(ledger, registry, client, own_url).await;
    let admissible = ledger.validate_pending_transactions(candidates);
    ledger.pending_transactions = admissible.clone();

    let tip_before = match ledger.latest_block() {
        Some(block) => block.hash.clone(),
        None => return Err(ChainError::ChainInvalid),
    };

    let block = ledger.assemble_and_mine(admissible, reward_address)?;

    replace_chain(ledger, registry, client, own_url).await;

    let mined = ledger.commit_mined_block(block, &tip_before)?;
    tracing::info!(
        hash = %mined.hash,
        transactions = mined.transactions.len(),
        "block mined and committed"
    );
    Ok(mined)
}
