use crate::block::{self, Block, BlockId};
use crate::config::SOFT_BLOCK_TX_LIMIT;
use crate::event::{Event, EventQueue};
use crate::latency::link_latency;
use crate::transaction::{PeerId, Transaction, TxnId};
use log::{debug, trace, warn};
use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// One of the four peer classes: the cross product of network speed and
/// CPU power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerClass {
    SlowLow,
    SlowHigh,
    FastLow,
    FastHigh,
}

impl PeerClass {
    pub fn of(is_slow: bool, is_low_cpu: bool) -> Self {
        match (is_slow, is_low_cpu) {
            (true, true) => PeerClass::SlowLow,
            (true, false) => PeerClass::SlowHigh,
            (false, true) => PeerClass::FastLow,
            (false, false) => PeerClass::FastHigh,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PeerClass::SlowLow => "slow_low",
            PeerClass::SlowHigh => "slow_high",
            PeerClass::FastLow => "fast_low",
            PeerClass::FastHigh => "fast_high",
        }
    }

    pub fn all() -> [PeerClass; 4] {
        [PeerClass::SlowLow, PeerClass::SlowHigh, PeerClass::FastLow, PeerClass::FastHigh]
    }
}

/// A simulated network participant. Holds only its own local view — its
/// mempool, its accepted block DAG, its orphan pool, and its tip — plus
/// back-references to neighbors by id (see `transaction::PeerId`'s doc
/// comment on why no direct `&Peer`/`Rc<Peer>` links exist here).
pub struct Peer {
    pub id: PeerId,
    pub is_slow: bool,
    pub is_low_cpu: bool,
    pub neighbors: Vec<PeerId>,
    pub mining_mean: f64,
    pub txn_mean: f64,
    pub seen_txns: HashSet<Rc<Transaction>>,
    pub block_tree: HashMap<BlockId, Rc<Block>>,
    pub seen_block_ids: HashSet<BlockId>,
    pub arrival_time: HashMap<BlockId, f64>,
    pub orphans: Vec<Rc<Block>>,
    pub tip_id: BlockId,
    pub blocks_mined_count: u64,
}

impl Peer {
    pub fn new(
        id: PeerId,
        is_slow: bool,
        is_low_cpu: bool,
        mining_mean: f64,
        txn_mean: f64,
        genesis: &Rc<Block>,
    ) -> Self {
        let mut block_tree = HashMap::new();
        block_tree.insert(genesis.id, Rc::clone(genesis));
        let mut seen_block_ids = HashSet::new();
        seen_block_ids.insert(genesis.id);
        let mut arrival_time = HashMap::new();
        arrival_time.insert(genesis.id, 0.0);

        Peer {
            id,
            is_slow,
            is_low_cpu,
            neighbors: Vec::new(),
            mining_mean,
            txn_mean,
            seen_txns: HashSet::new(),
            block_tree,
            seen_block_ids,
            arrival_time,
            orphans: Vec::new(),
            tip_id: genesis.id,
            blocks_mined_count: 0,
        }
    }

    pub fn class(&self) -> PeerClass {
        PeerClass::of(self.is_slow, self.is_low_cpu)
    }

    pub fn tip(&self) -> &Rc<Block> {
        self.block_tree.get(&self.tip_id).expect("a peer's tip is always present in its own local tree")
    }
}

/// Owns every peer for the simulation's lifetime, indexed by id. Blocks and
/// transactions refer into this registry by `PeerId` rather than holding a
/// direct reference, so there is no Peer <-> Block ownership cycle.
pub struct PeerRegistry {
    peers: Vec<Peer>,
}

impl PeerRegistry {
    pub fn new(peers: Vec<Peer>) -> Self {
        PeerRegistry { peers }
    }

    pub fn get(&self, id: PeerId) -> &Peer {
        &self.peers[id as usize]
    }

    pub fn get_mut(&mut self, id: PeerId) -> &mut Peer {
        &mut self.peers[id as usize]
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    /// Adds an undirected edge. The network graph itself (Watts-Strogatz
    /// construction) is a driver concern; this just records an edge once
    /// the driver has decided it exists.
    pub fn connect(&mut self, a: PeerId, b: PeerId) {
        self.peers[a as usize].neighbors.push(b);
        self.peers[b as usize].neighbors.push(a);
    }
}

/// The event-driven engine: owns the peer set, the event queue, the shared
/// RNG, and a global, append-only store of every block ever constructed
/// (keyed by id). §3 states blocks are "shared-immutable values"; the
/// global store is what lets `on_block_recv` resolve a just-arrived block's
/// parent for verification even when the *receiving* peer hasn't locally
/// accepted that ancestor yet (the per-peer `block_tree` instead governs
/// whether this peer has already adopted the ancestor chain, which is what
/// gates orphan buffering vs. BFS propagation).
pub struct Simulation {
    pub peers: PeerRegistry,
    pub queue: EventQueue,
    pub rng: StdRng,
    pub sim_time: f64,
    pub blocks_mined_total: u64,
    block_store: HashMap<BlockId, Rc<Block>>,
    next_block_id: BlockId,
    next_txn_id: TxnId,
}

impl Simulation {
    pub fn new(
        peers: PeerRegistry,
        rng: StdRng,
        sim_time: f64,
        genesis: Rc<Block>,
        next_block_id: BlockId,
        next_txn_id: TxnId,
    ) -> Self {
        let mut block_store = HashMap::new();
        block_store.insert(genesis.id, genesis);

        Simulation {
            peers,
            queue: EventQueue::new(),
            rng,
            sim_time,
            blocks_mined_total: 0,
            block_store,
            next_block_id,
            next_txn_id,
        }
    }

    pub fn enqueue(&mut self, fire_time: f64, event: Event) {
        self.queue.enqueue(fire_time, event);
    }

    pub fn next_txn_id(&mut self) -> TxnId {
        let id = self.next_txn_id;
        self.next_txn_id += 1;
        id
    }

    fn next_block_id(&mut self) -> BlockId {
        let id = self.next_block_id;
        self.next_block_id += 1;
        id
    }

    /// §4.1's two-phase main loop. Simulated time only advances by
    /// popping; the active phase's `now < sim_time` check uses the time of
    /// the *previous* pop, so one event whose fire_time crosses the bound
    /// is still dispatched in full before the loop exits — faithfully
    /// reproducing `examples/original_source/main.py`'s loop structure.
    pub fn run(&mut self) {
        let mut now = 0.0;
        while now < self.sim_time {
            match self.queue.pop_min() {
                Some((fire_time, event)) => {
                    now = fire_time;
                    self.dispatch(now, event);
                }
                None => break,
            }
        }

        debug!("active phase complete at t={now:.2}, draining {} in-flight events", self.queue.len());
        while let Some((fire_time, event)) = self.queue.pop_min() {
            if event.is_in_flight_delivery() {
                self.dispatch(fire_time, event);
            }
        }
    }

    fn dispatch(&mut self, now: f64, event: Event) {
        match event {
            Event::TxnGen { txn } => {
                let sender = txn.sender.expect("TxnGen always carries a transaction with a sender");
                self.on_txn_gen(sender, now, txn);
            }
            Event::TxnRecv { receiver, txn, .. } => self.on_txn_recv(receiver, now, txn),
            Event::BlockMined { blk } => {
                let miner = blk.miner.expect("BlockMined always carries a block with a miner");
                self.on_self_mined(miner, now, blk);
            }
            Event::BlockRecv { receiver, blk, .. } => self.on_block_recv(receiver, now, blk),
        }
    }

    fn broadcast_txn(&mut self, sender_id: PeerId, now: f64, txn: Rc<Transaction>) {
        let neighbors = self.peers.get(sender_id).neighbors.clone();
        let sender_slow = self.peers.get(sender_id).is_slow;
        for neighbor_id in neighbors {
            let neighbor_slow = self.peers.get(neighbor_id).is_slow;
            let delay = link_latency(sender_slow, neighbor_slow, txn.size, &mut self.rng);
            self.enqueue(
                now + delay,
                Event::TxnRecv { sender: sender_id, receiver: neighbor_id, txn: Rc::clone(&txn) },
            );
        }
    }

    fn broadcast_block(&mut self, sender_id: PeerId, now: f64, blk: Rc<Block>) {
        let neighbors = self.peers.get(sender_id).neighbors.clone();
        let sender_slow = self.peers.get(sender_id).is_slow;
        for neighbor_id in neighbors {
            let neighbor_slow = self.peers.get(neighbor_id).is_slow;
            let delay = link_latency(sender_slow, neighbor_slow, blk.size, &mut self.rng);
            self.enqueue(
                now + delay,
                Event::BlockRecv { sender: sender_id, receiver: neighbor_id, blk: Rc::clone(&blk) },
            );
        }
    }

    /// §4.3: pick a random spend amount against the sender's tip balance,
    /// finalize the pending transaction (a new value, never a mutation of
    /// the one the event carried), broadcast it, then renew this peer's
    /// transaction-generation stream for another Exp(txn_mean) interval.
    pub fn on_txn_gen(&mut self, peer_id: PeerId, now: f64, pending: Rc<Transaction>) {
        let tip_balance = self.peers.get(peer_id).tip().balances[peer_id as usize];
        // A spent-out peer's balance can be 0; clamp the upper bound to 1
        // so the range stays non-empty. The resulting coin amount simply
        // gets filtered out of any candidate block later (§4.4 step 2).
        let upper = tip_balance.max(1) as u64;
        let coins = self.rng.gen_range(1..=upper);

        let finalized = Rc::new(pending.with_coins(coins));
        self.peers.get_mut(peer_id).seen_txns.insert(Rc::clone(&finalized));
        self.broadcast_txn(peer_id, now, finalized);

        self.schedule_txn_gen(peer_id, now);
    }

    /// Schedules this peer's next self-generated transaction. A random
    /// receiver is picked among every other peer, matching
    /// `examples/original_source/peer.py::txnSend`'s receiver selection.
    pub fn schedule_txn_gen(&mut self, peer_id: PeerId, now: f64) {
        let n = self.peers.len() as u32;
        if n < 2 {
            return;
        }
        let receiver = loop {
            let candidate = self.rng.gen_range(0..n);
            if candidate != peer_id {
                break candidate;
            }
        };

        let txn_mean = self.peers.get(peer_id).txn_mean;
        let wait = Exp::new(1.0 / txn_mean).expect("txn_mean is always positive").sample(&mut self.rng);
        let id = self.next_txn_id();
        let pending = Rc::new(Transaction::pending(id, peer_id, receiver));
        self.enqueue(now + wait, Event::TxnGen { txn: pending });
    }

    /// §4.3: drop duplicates, otherwise forward.
    pub fn on_txn_recv(&mut self, peer_id: PeerId, now: f64, txn: Rc<Transaction>) {
        if self.peers.get(peer_id).seen_txns.contains(&txn) {
            return;
        }
        self.peers.get_mut(peer_id).seen_txns.insert(Rc::clone(&txn));
        self.broadcast_txn(peer_id, now, txn);
    }

    /// §4.4: build a candidate on top of `base`, retrying until it
    /// verifies, then schedule its `BlockMined` completion.
    pub fn schedule_mine(&mut self, peer_id: PeerId, base: Rc<Block>, now: f64) {
        loop {
            let available: Vec<Rc<Transaction>> = {
                let peer = self.peers.get(peer_id);
                peer.seen_txns
                    .iter()
                    .filter(|t| !base.mempool_snapshot.contains(*t))
                    .filter(|t| {
                        let sender = t.sender.expect("only non-coinbase transactions are ever gossiped") as usize;
                        (t.coins as i64) <= base.balances[sender]
                    })
                    .cloned()
                    .collect()
            };

            let k = if available.is_empty() {
                0
            } else {
                self.rng.gen_range(1..=available.len().min(SOFT_BLOCK_TX_LIMIT))
            };

            let mut chosen: HashSet<Rc<Transaction>> = HashSet::with_capacity(k + 1);
            if k > 0 {
                let mut idxs: Vec<usize> = (0..available.len()).collect();
                for i in 0..k {
                    let j = self.rng.gen_range(i..idxs.len());
                    idxs.swap(i, j);
                }
                chosen.extend(idxs[..k].iter().map(|&i| Rc::clone(&available[i])));
            }

            let coinbase_id = self.next_txn_id();
            chosen.insert(Rc::new(Transaction::coinbase(coinbase_id, peer_id)));

            let block_id = self.next_block_id();
            let candidate = Block::build(block_id, &base, peer_id, chosen);

            if block::verify(&candidate, &base) {
                let candidate = Rc::new(candidate);
                self.block_store.insert(candidate.id, Rc::clone(&candidate));

                let mining_mean = self.peers.get(peer_id).mining_mean;
                let wait = Exp::new(1.0 / mining_mean)
                    .expect("mining_mean is always positive")
                    .sample(&mut self.rng);
                self.enqueue(now + wait, Event::BlockMined { blk: candidate });
                return;
            }

            // verification can only fail here if the pre-filter above
            // missed an inconsistency (§9's open question); retry.
            warn!("peer {peer_id} built an invalid candidate on top of block {}, retrying", base.id);
        }
    }

    /// §4.5: a rival chain may have grown while this block was mining.
    pub fn on_self_mined(&mut self, peer_id: PeerId, now: f64, blk: Rc<Block>) {
        let tip_len = self.peers.get(peer_id).tip().chain_length;
        if blk.chain_length <= tip_len {
            trace!("peer {peer_id} discards stale self-mined block {}", blk.id);
            return;
        }

        self.blocks_mined_total += 1;
        {
            let peer = self.peers.get_mut(peer_id);
            peer.blocks_mined_count += 1;
            peer.arrival_time.insert(blk.id, now);
            peer.block_tree.insert(blk.id, Rc::clone(&blk));
            peer.seen_block_ids.insert(blk.id);
            peer.tip_id = blk.id;
        }

        self.broadcast_block(peer_id, now, Rc::clone(&blk));
        self.schedule_mine(peer_id, blk, now);
    }

    /// §4.6: dedupe, verify, buffer as an orphan or run the BFS wave that
    /// accepts it (and any orphans it unblocks) into this peer's tree.
    pub fn on_block_recv(&mut self, peer_id: PeerId, now: f64, blk: Rc<Block>) {
        if self.peers.get(peer_id).seen_block_ids.contains(&blk.id) {
            return;
        }
        self.peers.get_mut(peer_id).seen_block_ids.insert(blk.id);

        let Some(parent_id) = blk.parent_id() else {
            return; // genesis never arrives over the network
        };
        let parent = self
            .block_store
            .get(&parent_id)
            .cloned()
            .expect("a block's parent is always constructed before the block itself");

        if !block::verify(&blk, &parent) {
            return;
        }

        if !self.peers.get(peer_id).block_tree.contains_key(&parent_id) {
            self.peers.get_mut(peer_id).orphans.push(blk);
            return;
        }

        let mut frontier: VecDeque<Rc<Block>> = VecDeque::new();
        frontier.push_back(blk);
        let mut deepest: Option<Rc<Block>> = None;

        while let Some(b) = frontier.pop_front() {
            {
                let peer = self.peers.get_mut(peer_id);
                peer.arrival_time.insert(b.id, now);
                peer.block_tree.insert(b.id, Rc::clone(&b));
            }

            if deepest.as_ref().map_or(true, |d| b.chain_length > d.chain_length) {
                deepest = Some(Rc::clone(&b));
            }

            self.broadcast_block(peer_id, now, Rc::clone(&b));

            let peer = self.peers.get_mut(peer_id);
            let mut still_orphaned = Vec::with_capacity(peer.orphans.len());
            for orphan in peer.orphans.drain(..) {
                if orphan.parent_id() == Some(b.id) {
                    frontier.push_back(orphan);
                } else {
                    still_orphaned.push(orphan);
                }
            }
            peer.orphans = still_orphaned;
        }

        let deepest = deepest.expect("the BFS frontier always starts with at least the received block");
        let tip_len = self.peers.get(peer_id).tip().chain_length;
        if deepest.chain_length > tip_len {
            self.peers.get_mut(peer_id).tip_id = deepest.id;
            self.schedule_mine(peer_id, deepest, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn simulation(n: usize, sim_time: f64) -> Simulation {
        let genesis = Rc::new(Block::genesis(1, n, 1000));
        let peers = (0..n as u32)
            .map(|id| Peer::new(id, false, false, 100.0, 50.0, &genesis))
            .collect::<Vec<_>>();
        let mut registry = PeerRegistry::new(peers);
        for i in 0..n as u32 {
            for j in (i + 1)..n as u32 {
                registry.connect(i, j);
            }
        }
        Simulation::new(registry, StdRng::seed_from_u64(42), sim_time, genesis, 2, 0)
    }

    #[test]
    fn two_directly_connected_peers_converge_on_a_single_tip() {
        let mut sim = simulation(2, 200.0);
        let genesis = Rc::clone(sim.peers.get(0).tip());
        sim.schedule_mine(0, Rc::clone(&genesis), 0.0);
        sim.schedule_mine(1, genesis, 0.0);
        sim.run();

        let tip0 = sim.peers.get(0).tip_id;
        let tip1 = sim.peers.get(1).tip_id;
        assert_eq!(tip0, tip1, "both peers must converge on the same tip given enough simulated time");
    }

    #[test]
    fn self_mined_block_at_or_below_current_tip_length_is_discarded() {
        let mut sim = simulation(3, 50.0);
        let genesis = Rc::clone(sim.peers.get(0).tip());
        let mut txns = HashSet::new();
        txns.insert(Rc::new(Transaction::coinbase(100, 0)));
        let rival = Rc::new(Block::build(50, &genesis, 0, txns));
        sim.peers.get_mut(0).block_tree.insert(rival.id, Rc::clone(&rival));
        sim.peers.get_mut(0).tip_id = rival.id;

        let mut stale_txns = HashSet::new();
        stale_txns.insert(Rc::new(Transaction::coinbase(101, 0)));
        let stale = Rc::new(Block::build(51, &genesis, 0, stale_txns));
        sim.on_self_mined(0, 1.0, stale);

        assert_eq!(sim.peers.get(0).tip_id, rival.id, "a stale self-mined block must not replace a longer tip");
        assert_eq!(sim.peers.get(0).blocks_mined_count, 0);
    }

    #[test]
    fn orphan_is_buffered_until_its_parent_arrives() {
        let mut sim = simulation(2, 50.0);
        let genesis = Rc::clone(sim.peers.get(0).tip());

        // `schedule_mine` builds, verifies, and registers its candidate in
        // the global block store synchronously, before the `BlockMined`
        // event it enqueues is ever dispatched — pop that event straight
        // back out to get a properly-registered `parent`, then mine a
        // `child` on top of it the same way.
        sim.schedule_mine(1, Rc::clone(&genesis), 0.0);
        let parent = match sim.queue.pop_min().unwrap().1 {
            Event::BlockMined { blk } => blk,
            _ => unreachable!("schedule_mine only ever enqueues BlockMined"),
        };
        sim.schedule_mine(1, Rc::clone(&parent), 1.0);
        let child = match sim.queue.pop_min().unwrap().1 {
            Event::BlockMined { blk } => blk,
            _ => unreachable!("schedule_mine only ever enqueues BlockMined"),
        };

        // Peer 0 never accepted `parent` yet; `child` arrives first.
        sim.on_block_recv(0, 5.0, Rc::clone(&child));
        assert!(sim.peers.get(0).orphans.iter().any(|o| o.id == child.id));
        assert!(!sim.peers.get(0).block_tree.contains_key(&child.id));

        sim.on_block_recv(0, 6.0, Rc::clone(&parent));
        assert!(sim.peers.get(0).block_tree.contains_key(&parent.id));
        assert!(sim.peers.get(0).block_tree.contains_key(&child.id));
        assert!(sim.peers.get(0).orphans.is_empty());
    }
}
