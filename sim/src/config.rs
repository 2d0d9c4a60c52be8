use clap::Parser;
use p2psim_core::SimError;
use p2psim_core::config::{validate_peer_count, validate_percentage};

/// Total simulated time, in the same units as all latency and mining-time
/// sampling. Fixed, not a CLI flag — `examples/original_source/main.py`
/// hardcodes this rather than exposing it.
pub const SIM_TIME: f64 = 10000.0;

/// Fixed RNG seed, matching `examples/original_source/helper.py`'s
/// `np.random.default_rng(69)` so a run is reproducible end to end.
pub const SEED: u64 = 69;

/// Mean inter-block time target used by `config::mining_mean`.
pub const INTER_BLOCK_TARGET: f64 = 1000.0;

/// Command-line surface for the simulator driver.
#[derive(Debug, Parser)]
#[command(name = "p2psim", about = "Discrete-event simulator for a proof-of-work P2P network")]
pub struct Cli {
    /// Number of peers in the network.
    #[arg(long, default_value_t = 15)]
    pub n: usize,

    /// Percentage of peers with slow network links, in [0, 100].
    #[arg(long, default_value_t = 10.0)]
    pub z0: f64,

    /// Percentage of peers with low-power CPUs, in [0, 100].
    #[arg(long, default_value_t = 40.0)]
    pub z1: f64,

    /// Mean interval between a peer's own transaction generations.
    #[arg(long = "txn-mean", default_value_t = 8.0)]
    pub txn_mean: f64,
}

/// Validated configuration handed to the driver. Construction is the one
/// place `SimError` ever surfaces to a caller.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub n: usize,
    pub z0: f64,
    pub z1: f64,
    pub txn_mean: f64,
    pub sim_time: f64,
    pub seed: u64,
}

impl SimConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, SimError> {
        validate_peer_count(cli.n)?;
        validate_percentage("z0", cli.z0)?;
        validate_percentage("z1", cli.z1)?;

        Ok(SimConfig {
            n: cli.n,
            z0: cli.z0,
            z1: cli.z1,
            txn_mean: cli.txn_mean,
            sim_time: SIM_TIME,
            seed: SEED,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_an_invalid_z0() {
        let cli = Cli { n: 10, z0: 150.0, z1: 10.0, txn_mean: 50.0 };
        assert!(SimConfig::from_cli(&cli).is_err());
    }

    #[test]
    fn accepts_defaults() {
        let cli = Cli { n: 15, z0: 10.0, z1: 40.0, txn_mean: 8.0 };
        assert!(SimConfig::from_cli(&cli).is_ok());
    }
}
