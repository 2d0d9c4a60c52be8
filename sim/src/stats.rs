use p2psim_core::{PeerClass, Simulation};
use std::collections::HashMap;

/// Per-class aggregate stats, mirroring
/// `examples/original_source/main.py::print_network_stats`'s grouping of
/// peers by (speed, CPU) class.
#[derive(Debug, Default, Clone)]
pub struct ClassStats {
    pub peer_count: usize,
    pub blocks_mined: u64,
    pub blocks_in_longest_chain: u64,
}

impl ClassStats {
    /// Fraction of this class's own mined blocks that ended up retained in
    /// the longest chain.
    pub fn conversion_rate(&self) -> f64 {
        if self.blocks_mined == 0 {
            0.0
        } else {
            self.blocks_in_longest_chain as f64 / self.blocks_mined as f64
        }
    }

    /// This class's share of every block in the longest chain.
    pub fn share_of_longest_chain(&self, longest_chain_length: u64) -> f64 {
        if longest_chain_length == 0 {
            0.0
        } else {
            self.blocks_in_longest_chain as f64 / longest_chain_length as f64
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct NetworkStats {
    pub longest_chain_length: u64,
    pub total_blocks_mined: u64,
    pub by_class: HashMap<&'static str, ClassStats>,
    pub branch_lengths: Vec<u64>,
}

impl NetworkStats {
    /// Fraction of all mined blocks that survived into the longest chain.
    pub fn retention(&self) -> f64 {
        if self.total_blocks_mined == 0 {
            0.0
        } else {
            self.longest_chain_length as f64 / self.total_blocks_mined as f64
        }
    }

    pub fn mean_branch_length(&self) -> f64 {
        if self.branch_lengths.is_empty() {
            0.0
        } else {
            self.branch_lengths.iter().sum::<u64>() as f64 / self.branch_lengths.len() as f64
        }
    }
}

/// Computes end-of-run statistics from a single peer's view of the chain:
/// whichever peer holds the globally-longest tip stands in for "the"
/// longest chain, since every peer eventually converges (§5's Invariant 5).
pub fn compute(sim: &Simulation) -> NetworkStats {
    let mut by_class: HashMap<&'static str, ClassStats> = HashMap::new();
    for class in PeerClass::all() {
        by_class.insert(class.label(), ClassStats::default());
    }

    let mut longest_chain_length = 0;
    let mut longest_chain_miners: HashMap<u32, u64> = HashMap::new();

    for peer in sim.peers.iter() {
        let entry = by_class.get_mut(peer.class().label()).expect("every class was pre-populated");
        entry.peer_count += 1;
        entry.blocks_mined += peer.blocks_mined_count;

        let tip = peer.tip();
        if tip.chain_length > longest_chain_length {
            longest_chain_length = tip.chain_length;
        }
    }

    // Walk the longest-tipped peer's accepted ancestry back to genesis,
    // crediting each block's miner, and collect every maximal branch length
    // along the way (a block with no child in this peer's tree is a leaf).
    if let Some(longest_peer) = sim.peers.iter().max_by_key(|p| p.tip().chain_length) {
        let mut children: HashMap<u64, u64> = HashMap::new();
        for block in longest_peer.block_tree.values() {
            if let Some(parent_id) = block.parent_id() {
                *children.entry(parent_id).or_insert(0) += 1;
            }
        }

        let mut branch_lengths = Vec::new();
        for block in longest_peer.block_tree.values() {
            if !children.contains_key(&block.id) {
                branch_lengths.push(block.chain_length);
            }
            if let Some(miner) = block.miner {
                *longest_chain_miners.entry(miner).or_insert(0) += 1;
            }
        }
        branch_lengths.sort_unstable();

        for (miner, count) in longest_chain_miners {
            if let Some(peer) = sim.peers.iter().find(|p| p.id == miner) {
                by_class.get_mut(peer.class().label()).unwrap().blocks_in_longest_chain += count;
            }
        }

        return NetworkStats {
            longest_chain_length,
            total_blocks_mined: sim.blocks_mined_total,
            by_class,
            branch_lengths,
        };
    }

    NetworkStats { longest_chain_length, total_blocks_mined: sim.blocks_mined_total, by_class, branch_lengths: Vec::new() }
}
