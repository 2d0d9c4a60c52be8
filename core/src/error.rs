use thiserror::Error;

/// §7: "Configuration out of range ... surfaced to the driver." This is the
/// only error condition the core layer ever produces outward — every
/// per-block and per-transaction error (invalid block, orphan, stale mined
/// block) is absorbed silently by the handler that encounters it.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("peer count must be at least 3, got {0}")]
    TooFewPeers(usize),
    #[error("{field} must be a percentage in [0, 100], got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },
}
