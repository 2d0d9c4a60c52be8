use crate::transaction::{PeerId, Transaction};
use std::collections::HashSet;
use std::rc::Rc;

pub type BlockId = u64;

/// Genesis encoding per the redesign note: a tagged variant replaces the
/// source's sentinel parent id of 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Genesis,
    Child(BlockId),
}

/// Immutable once constructed. Balances and the mempool snapshot are full
/// copies derived from the parent, never aliased with it.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub parent: ParentRef,
    pub included_txns: HashSet<Rc<Transaction>>,
    pub mempool_snapshot: HashSet<Rc<Transaction>>,
    pub chain_length: u64,
    pub balances: Vec<i64>,
    pub miner: Option<PeerId>,
    pub size: u32,
}

impl Block {
    pub fn genesis(id: BlockId, n_peers: usize, initial_balance: i64) -> Self {
        Block {
            id,
            parent: ParentRef::Genesis,
            included_txns: HashSet::new(),
            mempool_snapshot: HashSet::new(),
            chain_length: 1,
            balances: vec![initial_balance; n_peers],
            miner: None,
            size: 1,
        }
    }

    /// Builds a candidate on top of `parent`. `balances` and
    /// `mempool_snapshot` are cloned from `parent` then extended — never
    /// shared with it — so two candidates built on the same parent never
    /// observe each other's inclusions (see design notes on the source's
    /// mempool-aliasing bug).
    pub fn build(id: BlockId, parent: &Block, miner: PeerId, included_txns: HashSet<Rc<Transaction>>) -> Self {
        let mut balances = parent.balances.clone();
        for txn in &included_txns {
            if !txn.coinbase {
                let sender = txn.sender.expect("non-coinbase transaction must have a sender") as usize;
                balances[sender] -= txn.coins as i64;
            }
            balances[txn.receiver as usize] += txn.coins as i64;
        }

        let mut mempool_snapshot = parent.mempool_snapshot.clone();
        mempool_snapshot.extend(included_txns.iter().cloned());

        Block {
            id,
            parent: ParentRef::Child(parent.id),
            size: 1 + included_txns.len() as u32,
            included_txns,
            mempool_snapshot,
            chain_length: parent.chain_length + 1,
            balances,
            miner: Some(miner),
        }
    }

    pub fn parent_id(&self) -> Option<BlockId> {
        match self.parent {
            ParentRef::Genesis => None,
            ParentRef::Child(id) => Some(id),
        }
    }
}

/// Re-derives each non-coinbase transaction's effect on `parent`'s balances
/// and checks it matches `block`, rejecting a negative sender balance.
///
/// Note: the source this was ported from checks `balance[sender] < 0` as
/// its *pass* condition, which accepts exactly the invalid blocks and
/// rejects the valid ones. This is the corrected, non-inverted check.
pub fn verify(block: &Block, parent: &Block) -> bool {
    for txn in &block.included_txns {
        if txn.coinbase {
            continue;
        }
        let Some(sender) = txn.sender.map(|s| s as usize) else {
            return false;
        };
        let receiver = txn.receiver as usize;

        let expected_sender = parent.balances[sender] - txn.coins as i64;
        let expected_receiver = parent.balances[receiver] + txn.coins as i64;
        if block.balances[sender] != expected_sender || block.balances[receiver] != expected_receiver {
            return false;
        }
        if block.balances[sender] < 0 {
            return false;
        }
    }
    true
}
