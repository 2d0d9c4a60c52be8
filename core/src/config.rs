use crate::error::SimError;

/// Uniform starting balance for every peer's genesis block.
pub const INITIAL_BALANCE: i64 = 1000;

/// Soft block-size limit: at most this many non-coinbase transactions per
/// candidate block, reserving one slot for the coinbase.
pub const SOFT_BLOCK_TX_LIMIT: usize = 1022;

pub fn validate_peer_count(n: usize) -> Result<(), SimError> {
    if n < 3 {
        return Err(SimError::TooFewPeers(n));
    }
    Ok(())
}

pub fn validate_percentage(field: &'static str, value: f64) -> Result<(), SimError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(SimError::PercentOutOfRange { field, value });
    }
    Ok(())
}

/// §4.4: mining_mean is proportional to `I × (n × (10 − 9·z1))` for
/// low-CPU peers and one tenth that for high-CPU peers, where `z1` is the
/// fraction of low-CPU peers. This is gated on CPU class, not speed class —
/// see DESIGN.md's note on the source's `is_slow`-gated variable naming
/// mismatch (`invh0`/`invh1` are named and documented after the low-CPU
/// fraction but the source's `if is_slow` branches on the wrong flag).
pub fn mining_mean(is_low_cpu: bool, inter_block_target: f64, n: usize, low_cpu_fraction: f64) -> f64 {
    let inv_h0 = n as f64 * (10.0 - 9.0 * low_cpu_fraction);
    let inv_h1 = inv_h0 / 10.0;
    inter_block_target * if is_low_cpu { inv_h0 } else { inv_h1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_few_peers() {
        assert!(validate_peer_count(2).is_err());
        assert!(validate_peer_count(3).is_ok());
    }

    #[test]
    fn rejects_percentages_out_of_range() {
        assert!(validate_percentage("z0", -1.0).is_err());
        assert!(validate_percentage("z0", 100.1).is_err());
        assert!(validate_percentage("z0", 50.0).is_ok());
    }

    #[test]
    fn low_cpu_peers_mine_ten_times_slower() {
        let low = mining_mean(true, 1000.0, 15, 0.4);
        let high = mining_mean(false, 1000.0, 15, 0.4);
        assert!((low / high - 10.0).abs() < 1e-9);
    }
}
