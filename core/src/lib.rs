pub mod block;
pub mod config;
pub mod error;
pub mod event;
pub mod latency;
pub mod peer;
pub mod transaction;

// Explicit re-exports to avoid ambiguous glob re-exports.
pub use block::{Block, BlockId, ParentRef};
pub use error::SimError;
pub use event::{Event, EventQueue};
pub use peer::{Peer, PeerClass, PeerRegistry, Simulation};
pub use transaction::{PeerId, Transaction, TxnId};
