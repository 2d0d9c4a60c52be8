use clap::Parser;
use log::info;
use p2psim::config::{Cli, SimConfig};
use p2psim::{driver, figures, logs, network, stats};
use rand::SeedableRng;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env().filter_level(log::LevelFilter::Info).init();

    let cli = Cli::parse();
    let cfg = SimConfig::from_cli(&cli)?;
    info!("starting simulation: n={} z0={} z1={} txn_mean={}", cfg.n, cfg.z0, cfg.z1, cfg.txn_mean);

    let mut rng = rand::rngs::StdRng::seed_from_u64(cfg.seed);
    let (registry, genesis) = network::build_network(&cfg, &mut rng);
    let sim = driver::run(&cfg, registry, genesis);

    info!("simulation complete: {} blocks mined across {} peers", sim.blocks_mined_total, sim.peers.len());

    let net_stats = stats::compute(&sim);
    println!("longest chain length: {}", net_stats.longest_chain_length);
    println!("total blocks mined: {}", net_stats.total_blocks_mined);
    println!("retention fraction: {:.4}", net_stats.retention());
    for (class, s) in &net_stats.by_class {
        println!(
            "class {class}: peers={} mined={} in_longest_chain={} share_of_longest_chain={:.4} conversion_rate={:.4}",
            s.peer_count,
            s.blocks_mined,
            s.blocks_in_longest_chain,
            s.share_of_longest_chain(net_stats.longest_chain_length),
            s.conversion_rate()
        );
    }
    println!("branch lengths: {:?}", net_stats.branch_lengths);
    println!("mean branch length: {:.4}", net_stats.mean_branch_length());

    logs::write_all(&sim, Path::new("./logs"))?;
    figures::render_all(&sim, Path::new("./figures"))?;

    Ok(())
}
