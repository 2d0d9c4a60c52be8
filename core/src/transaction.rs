use std::hash::{Hash, Hasher};

/// Stable identity of a simulated network participant. Transactions and
/// blocks never own a `Peer` — they carry this id and are resolved through
/// a `PeerRegistry` (see `peer.rs`), so there is no Peer <-> Block cycle.
pub type PeerId = u32;

pub type TxnId = u64;

/// An immutable transfer of coins between two peers, or a miner's coinbase
/// reward. Identity is by `id`, never by content — two transactions with
/// identical sender/receiver/coins are still distinct if minted separately.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TxnId,
    pub sender: Option<PeerId>,
    pub receiver: PeerId,
    pub coins: u64,
    pub coinbase: bool,
    pub size: u32,
}

impl Transaction {
    pub const COINBASE_REWARD: u64 = 50;

    /// A transaction generated by `sender`, still missing its coin amount
    /// (decided later by `on_txn_gen`, see `peer::Simulation`).
    pub fn pending(id: TxnId, sender: PeerId, receiver: PeerId) -> Self {
        Transaction { id, sender: Some(sender), receiver, coins: 0, coinbase: false, size: 1 }
    }

    /// A block's self-issued mining reward, always 50 coins, no sender.
    pub fn coinbase(id: TxnId, receiver: PeerId) -> Self {
        Transaction { id, sender: None, receiver, coins: Self::COINBASE_REWARD, coinbase: true, size: 1 }
    }

    /// Transactions are never mutated in place; finalizing a pending one
    /// produces a new immutable value carrying the same identity.
    pub fn with_coins(&self, coins: u64) -> Self {
        Transaction { coins, ..self.clone() }
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transaction {}

impl Hash for Transaction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coinbase_has_no_sender_and_pays_fixed_reward() {
        let cb = Transaction::coinbase(1, 7);
        assert!(cb.sender.is_none());
        assert_eq!(cb.coins, 50);
        assert!(cb.coinbase);
    }

    #[test]
    fn identity_is_by_id_not_content() {
        let a = Transaction::pending(1, 0, 1);
        let b = Transaction::pending(1, 2, 3);
        assert_eq!(a, b, "same id must compare equal even with different fields");
    }

    #[test]
    fn with_coins_does_not_mutate_the_original() {
        let pending = Transaction::pending(5, 0, 1);
        let finalized = pending.with_coins(42);
        assert_eq!(pending.coins, 0);
        assert_eq!(finalized.coins, 42);
        assert_eq!(finalized.id, pending.id);
    }
}
