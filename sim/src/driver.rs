use p2psim_core::{Block, PeerRegistry, Simulation};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::rc::Rc;

use crate::config::SimConfig;

/// Wires a built network into a fresh `Simulation`, seeds every peer's
/// transaction-generation stream and initial mining attempt (both rooted at
/// genesis), and runs it to completion.
pub fn run(cfg: &SimConfig, registry: PeerRegistry, genesis: Rc<Block>) -> Simulation {
    let rng = StdRng::seed_from_u64(cfg.seed);
    let n = registry.len();
    let mut sim = Simulation::new(registry, rng, cfg.sim_time, Rc::clone(&genesis), 2, 0);

    for peer_id in 0..n as u32 {
        sim.schedule_txn_gen(peer_id, 0.0);
        sim.schedule_mine(peer_id, Rc::clone(&genesis), 0.0);
    }

    sim.run();
    sim
}
