use rand::Rng;
use rand_distr::{Distribution, Exp};

/// `link_latency(sender, receiver, size)`: ρ ~ U[10,500], bandwidth `c` is 5
/// if either endpoint is slow else 100, and a queuing delay drawn from
/// Exp(mean = 96/c). Ported from
/// `examples/original_source/peer.py::compute_linkLatency`.
pub fn link_latency(sender_slow: bool, receiver_slow: bool, size: u32, rng: &mut impl Rng) -> f64 {
    let rho: f64 = rng.gen_range(10.0..=500.0);
    let bandwidth: f64 = if sender_slow || receiver_slow { 5.0 } else { 100.0 };
    let queuing = Exp::new(bandwidth / 96.0)
        .expect("bandwidth is always positive")
        .sample(rng);
    rho + (size as f64) / bandwidth + queuing
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn latency_is_always_positive() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            assert!(link_latency(false, false, 1, &mut rng) > 0.0);
            assert!(link_latency(true, false, 1, &mut rng) > 0.0);
        }
    }

    #[test]
    fn slow_links_are_on_average_slower_than_fast_links() {
        let mut rng = StdRng::seed_from_u64(2);
        let fast_mean: f64 = (0..5000).map(|_| link_latency(false, false, 1, &mut rng)).sum::<f64>() / 5000.0;
        let slow_mean: f64 = (0..5000).map(|_| link_latency(true, true, 1, &mut rng)).sum::<f64>() / 5000.0;
        assert!(slow_mean > fast_mean);
    }
}
