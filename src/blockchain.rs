//! Ledger state and consensus rules
//!
//! The `Blockchain` owns the block chain and the mempool of unconfirmed
//! transactions. Balances are never cached: they are replayed from genesis on
//! every query, which keeps the chain itself the single source of truth.

use crate::block::{Block, GENESIS_PREVIOUS_HASH};
use crate::error::ChainError;
use crate::transaction::Transaction;
use std::collections::HashMap;

pub const DEFAULT_DIFFICULTY: usize = 2;
pub const DEFAULT_MINING_REWARD: u64 = 100;

pub struct Blockchain {
    /// Ordered blocks, genesis first. Empty until a peer supplies a chain or
    /// genesis is synthesized locally.
    pub chain: Vec<Block>,
    /// Mempool: admitted but unconfirmed transactions, in admission order.
    pub pending_transactions: Vec<Transaction>,
    /// Required number of leading zero hex characters in a mined block hash.
    pub difficulty: usize,
    /// Amount credited to the miner-supplied address per mined block.
    pub mining_reward: u64,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD)
    }
}

impl Blockchain {
    pub fn new(difficulty: usize, mining_reward: u64) -> Self {
        Blockchain {
            chain: Vec::new(),
            pending_transactions: Vec::new(),
            difficulty,
            mining_reward,
        }
    }

    /// Synthesizes a genesis block if the chain is still empty. Idempotent.
    pub fn ensure_genesis(&mut self) {
        if self.chain.is_empty() {
            self.chain.push(Block::genesis());
        }
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Confirmed balance of an address, replayed over the whole chain.
    pub fn balance_of(&self, address: &str) -> i64 {
        self.balance_i128(address)
            .clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Replay in i128: a u64 amount cast to i64 can wrap negative, which
    /// would invert every balance comparison downstream.
    fn balance_i128(&self, address: &str) -> i128 {
        let mut balance = 0i128;
        for block in &self.chain {
            for tx in &block.transactions {
                if tx.from_address.as_deref() == Some(address) {
                    balance -= tx.amount as i128;
                }
                if tx.to_address == address {
                    balance += tx.amount as i128;
                }
            }
        }
        balance
    }

    /// All confirmed transactions touching an address, ascending by timestamp.
    pub fn transactions_for_address(&self, address: &str) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> = self
            .chain
            .iter()
            .flat_map(|block| block.transactions.iter())
            .filter(|tx| tx.involves(address))
            .cloned()
            .collect();
        txs.sort_by_key(|tx| tx.timestamp);
        txs
    }

    /// Admits a transaction into the mempool.
    ///
    /// Beyond signature and amount checks, the sender's confirmed balance
    /// must cover this amount *plus* everything they already have pending:
    /// a wallet cannot overspend by splitting across unconfirmed
    /// transactions that each pass the simple balance check in isolation.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<(), ChainError> {
        let from = match transaction.from_address.as_deref() {
            Some(from) if !from.is_empty() => from.to_string(),
            _ => return Err(ChainError::InvalidAddress),
        };
        if transaction.to_address.is_empty() {
            return Err(ChainError::InvalidAddress);
        }

        if !transaction.is_valid()? {
            return Err(ChainError::InvalidSignature);
        }

        if transaction.amount == 0 {
            return Err(ChainError::NonPositiveAmount);
        }

        let balance = self.balance_i128(&from);
        if balance < transaction.amount as i128 {
            return Err(ChainError::InsufficientBalance(format!(
                "address {} holds {}, cannot send {}",
                from, balance, transaction.amount
            )));
        }

        let pending_outflow: i128 = self
            .pending_transactions
            .iter()
            .filter(|tx| tx.from_address.as_deref() == Some(from.as_str()))
            .map(|tx| tx.amount as i128)
            .sum();
        if balance - pending_outflow - (transaction.amount as i128) < 0 {
            return Err(ChainError::InsufficientBalance(format!(
                "address {} holds {} with {} already pending, cannot send {}",
                from, balance, pending_outflow, transaction.amount
            )));
        }

        self.pending_transactions.push(transaction);
        Ok(())
    }

    /// Double-spend guard at block-formation time.
    ///
    /// Takes a candidate set (local plus peer-supplied) and returns the
    /// maximal subset applicable without overdrawing any address, processed
    /// oldest first with a stable tie-break. Unverifiable transactions and
    /// ones that would overdraw are dropped, never retried: this is a single
    /// forward scan. Working balances are seeded lazily from the confirmed
    /// chain the first time an address is touched, on both debit and credit
    /// side. System-issued transactions never belong in a candidate set (the
    /// reward is appended after reconciliation) and are dropped too.
    pub fn validate_pending_transactions(
        &self,
        mut candidates: Vec<Transaction>,
    ) -> Vec<Transaction> {
        candidates.sort_by_key(|tx| tx.timestamp);

        let mut balances: HashMap<String, i128> = HashMap::new();
        let mut accepted = Vec::new();

        for tx in candidates {
            let from = match tx.from_address.as_deref() {
                Some(from) => from.to_string(),
                None => continue,
            };
            if !tx.is_valid().unwrap_or(false) {
                continue;
            }

            let debit = balances
                .entry(from.clone())
                .or_insert_with(|| self.balance_i128(&from));
            if *debit - (tx.amount as i128) < 0 {
                continue;
            }
            *debit -= tx.amount as i128;

            let credit = balances
                .entry(tx.to_address.clone())
                .or_insert_with(|| self.balance_i128(&tx.to_address));
            *credit += tx.amount as i128;

            accepted.push(tx);
        }

        accepted
    }

    /// Assembles the next block from already-reconciled transactions and the
    /// mining reward, then solves proof-of-work. Does not touch the chain:
    /// committing is a separate step so the caller can run the peer-sync
    /// race check in between.
    pub fn assemble_and_mine(
        &self,
        mut transactions: Vec<Transaction>,
        reward_address: &str,
    ) -> Result<Block, ChainError> {
        let previous_hash = self
            .latest_block()
            .map(|b| b.hash.clone())
            .ok_or(ChainError::ChainInvalid)?;

        transactions.push(Transaction::reward(
            reward_address.to_string(),
            self.mining_reward,
        ));

        let mut block = Block::new(transactions, previous_hash);
        block.mine(self.difficulty);
        Ok(block)
    }

    /// Appends a mined block, but only if the chain tip is still the one the
    /// block was mined on. A moved tip means another node won the race and
    /// its chain was already adopted; the local block is discarded.
    pub fn commit_mined_block(
        &mut self,
        block: Block,
        tip_before: &str,
    ) -> Result<Block, ChainError> {
        let tip_now = self.latest_block().map(|b| b.hash.as_str()).unwrap_or("");
        if tip_now != tip_before {
            return Err(ChainError::StaleMiningResult);
        }

        self.chain.push(block.clone());
        self.pending_transactions.clear();
        Ok(block)
    }

    /// Walks a candidate chain start to end. All-or-nothing: any failure
    /// invalidates the whole chain.
    pub fn is_chain_valid(&self, chain: &[Block]) -> bool {
        for (i, block) in chain.iter().enumerate() {
            if i == 0 {
                if block.previous_hash != GENESIS_PREVIOUS_HASH {
                    return false;
                }
            } else if block.previous_hash != chain[i - 1].hash {
                return false;
            }

            // Recomputing the hash detects any tampering with block fields.
            if block.hash != block.calculate_hash() {
                return false;
            }

            if i != 0 && !block.meets_difficulty(self.difficulty) {
                return false;
            }

            if !block.has_valid_transactions() {
                return false;
            }
        }
        true
    }

    /// Wholesale replacement by a longer valid peer chain. Clears the
    /// mempool: confirmed transactions may already be included remotely and
    /// are not re-submitted.
    pub fn adopt_chain(&mut self, chain: Vec<Block>) {
        self.chain = chain;
        self.pending_transactions.clear();
    }
}
