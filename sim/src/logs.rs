use anyhow::{Context, Result};
use p2psim_core::Simulation;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Recreates `./logs` and writes one `log_tree_<id>.txt` per peer: a
/// `Data For Node Id: <id>` header, then one
/// `Block Id:…, Parent ID:…, Miner ID:…, Txns:…, Time:…` line per block in
/// the peer's tree, in arrival order.
pub fn write_all(sim: &Simulation, dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("clearing {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    for peer in sim.peers.iter() {
        let path = dir.join(format!("log_tree_{}.txt", peer.id));
        let mut file = fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;

        let mut blocks: Vec<_> = peer.block_tree.values().collect();
        blocks.sort_by(|a, b| {
            let ta = peer.arrival_time.get(&a.id).copied().unwrap_or(0.0);
            let tb = peer.arrival_time.get(&b.id).copied().unwrap_or(0.0);
            ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
        });

        writeln!(file, "Data For Node Id: {}", peer.id)?;
        for block in blocks {
            let t = peer.arrival_time.get(&block.id).copied().unwrap_or(0.0);
            let parent = block
                .parent_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "None".to_string());
            let miner = block
                .miner
                .map(|id| id.to_string())
                .unwrap_or_else(|| "None".to_string());
            writeln!(
                file,
                "Block Id:{}, Parent ID:{}, Miner ID:{}, Txns:{}, Time:{}",
                block.id,
                parent,
                miner,
                block.included_txns.len(),
                t
            )?;
        }
    }
    Ok(())
}
