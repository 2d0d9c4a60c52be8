use p2psim_core::config::{INITIAL_BALANCE, mining_mean};
use p2psim_core::{Block, Peer, PeerRegistry};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use crate::config::{INTER_BLOCK_TARGET, SimConfig};

/// Ring-lattice degree (each node's initial neighbor count on both sides)
/// for the Watts-Strogatz construction. `examples/original_source/main.py`
/// calls `connected_watts_strogatz_graph(n, k, beta, tries)`; networkx's
/// default `k` for this network size class is 4.
const RING_DEGREE: usize = 4;
const REWIRE_PROB: f64 = 0.3;
const MAX_TRIES: usize = 100;

/// Builds the peer set and gossip graph: a connected Watts-Strogatz
/// small-world network, §6's z0/z1-driven class assignment, and a shared
/// genesis block every peer starts from.
///
/// No crate in the reference corpus builds a Watts-Strogatz graph (networkx
/// is a Python-only dependency), so this is hand-rolled on top of `rand`,
/// which the teacher already depends on.
pub fn build_network(cfg: &SimConfig, rng: &mut StdRng) -> (PeerRegistry, Rc<Block>) {
    let genesis = Rc::new(Block::genesis(1, cfg.n, INITIAL_BALANCE));

    let (slow, low_cpu) = assign_peer_classes(cfg.n, cfg.z0, cfg.z1, rng);
    let peers: Vec<Peer> = (0..cfg.n as u32)
        .map(|id| {
            let is_slow = slow[id as usize];
            let is_low_cpu = low_cpu[id as usize];
            let mean = mining_mean(is_low_cpu, INTER_BLOCK_TARGET, cfg.n, cfg.z1 / 100.0);
            Peer::new(id, is_slow, is_low_cpu, mean, cfg.txn_mean, &genesis)
        })
        .collect();

    let mut registry = PeerRegistry::new(peers);
    for (a, b) in watts_strogatz_edges(cfg.n, rng) {
        registry.connect(a, b);
    }

    (registry, genesis)
}

/// Splits peers into slow/fast and low/high-CPU classes by sampling
/// without replacement, matching `random.sample` in
/// `examples/original_source/main.py`'s `slow_selec`/`low_cpu_selec`.
fn assign_peer_classes(n: usize, z0: f64, z1: f64, rng: &mut StdRng) -> (Vec<bool>, Vec<bool>) {
    let n_slow = ((n as f64) * z0 / 100.0).round() as usize;
    let n_low_cpu = ((n as f64) * z1 / 100.0).round() as usize;

    let slow_idx = rand::seq::index::sample(rng, n, n_slow.min(n));
    let low_cpu_idx = rand::seq::index::sample(rng, n, n_low_cpu.min(n));

    let mut slow = vec![false; n];
    for i in slow_idx.iter() {
        slow[i] = true;
    }
    let mut low_cpu = vec![false; n];
    for i in low_cpu_idx.iter() {
        low_cpu[i] = true;
    }
    (slow, low_cpu)
}

/// Builds a connected Watts-Strogatz graph: start from a ring lattice, then
/// rewire each edge with probability `REWIRE_PROB`, retrying the whole
/// construction up to `MAX_TRIES` times until the result is connected —
/// the same "retry until connected" contract `connected_watts_strogatz_graph`
/// gives the source.
fn watts_strogatz_edges(n: usize, rng: &mut StdRng) -> Vec<(u32, u32)> {
    let k = RING_DEGREE.min(n.saturating_sub(1));
    if k == 0 {
        return Vec::new();
    }

    for _ in 0..MAX_TRIES {
        let mut edges: HashSet<(u32, u32)> = HashSet::new();
        for i in 0..n {
            for j in 1..=(k / 2) {
                let neighbor = (i + j) % n;
                edges.insert(order(i as u32, neighbor as u32));
            }
        }

        let mut rewired: Vec<(u32, u32)> = edges.into_iter().collect();
        rewired.shuffle(rng);
        let mut final_edges: HashSet<(u32, u32)> = HashSet::new();
        for (a, b) in rewired {
            if rng.gen::<f64>() < REWIRE_PROB {
                let candidates: Vec<u32> =
                    (0..n as u32).filter(|&c| c != a && !final_edges.contains(&order(a, c))).collect();
                if let Some(&new_b) = candidates.choose(rng) {
                    final_edges.insert(order(a, new_b));
                    continue;
                }
            }
            final_edges.insert(order(a, b));
        }

        let edge_list: Vec<(u32, u32)> = final_edges.into_iter().collect();
        if is_connected(n, &edge_list) {
            return edge_list;
        }
    }

    // Fall back to the unrewired ring lattice, which is always connected
    // for k >= 2.
    let mut edges = HashSet::new();
    for i in 0..n {
        for j in 1..=(k / 2) {
            edges.insert(order(i as u32, ((i + j) % n) as u32));
        }
    }
    edges.into_iter().collect()
}

fn order(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

fn is_connected(n: usize, edges: &[(u32, u32)]) -> bool {
    if n == 0 {
        return true;
    }
    let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); n];
    for &(a, b) in edges {
        adjacency[a as usize].push(b);
        adjacency[b as usize].push(a);
    }

    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();
    queue.push_back(0u32);
    visited[0] = true;
    let mut count = 1;
    while let Some(node) = queue.pop_front() {
        for &next in &adjacency[node as usize] {
            if !visited[next as usize] {
                visited[next as usize] = true;
                count += 1;
                queue.push_back(next);
            }
        }
    }
    count == n
}
