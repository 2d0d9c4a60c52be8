use anyhow::{Context, Result};
use p2psim_core::Simulation;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

/// Recreates `./figures` and renders a circular layout of the gossip graph
/// plus, per peer, a chain-length-over-arrival-time plot standing in for
/// `examples/original_source/main.py::visualize_blockchain`'s tree
/// rendering. No crate in the reference corpus does raster chart
/// rendering; `plotters`' bitmap backend is the standard choice for this
/// job in the wider ecosystem.
pub fn render_all(sim: &Simulation, dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("clearing {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    render_network_graph(sim, &dir.join("network_graph.png"))?;
    for peer in sim.peers.iter() {
        render_blockchain(sim, peer.id, &dir.join(format!("blockchain_{}.png", peer.id)))?;
    }
    Ok(())
}

fn render_network_graph(sim: &Simulation, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = sim.peers.len().max(1) as f64;
    let center = (400.0, 400.0);
    let radius = 350.0;
    let positions: Vec<(f64, f64)> = (0..sim.peers.len())
        .map(|i| {
            let theta = 2.0 * PI * (i as f64) / n;
            (center.0 + radius * theta.cos(), center.1 + radius * theta.sin())
        })
        .collect();

    for peer in sim.peers.iter() {
        let (x1, y1) = positions[peer.id as usize];
        for &neighbor in &peer.neighbors {
            if neighbor > peer.id {
                let (x2, y2) = positions[neighbor as usize];
                root.draw(&PathElement::new(vec![(x1 as i32, y1 as i32), (x2 as i32, y2 as i32)], &BLACK.mix(0.3)))?;
            }
        }
    }
    for peer in sim.peers.iter() {
        let (x, y) = positions[peer.id as usize];
        let color = if peer.is_slow { &RED } else { &BLUE };
        root.draw(&Circle::new((x as i32, y as i32), 6, color.filled()))?;
    }

    root.present().context("flushing network graph to disk")?;
    Ok(())
}

fn render_blockchain(sim: &Simulation, peer_id: u32, path: &Path) -> Result<()> {
    let peer = sim.peers.get(peer_id);
    let mut points: Vec<(f64, f64)> = peer
        .block_tree
        .values()
        .map(|b| (peer.arrival_time.get(&b.id).copied().unwrap_or(0.0), b.chain_length as f64))
        .collect();
    points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let root = BitMapBackend::new(path, (900, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_t = points.iter().map(|p| p.0).fold(1.0, f64::max);
    let max_len = points.iter().map(|p| p.1).fold(1.0, f64::max);

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("peer {peer_id} chain growth"), ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(30)
        .y_label_area_size(30)
        .build_cartesian_2d(0.0..max_t.max(1.0), 0.0..max_len.max(1.0))?;

    chart.configure_mesh().draw()?;
    chart.draw_series(LineSeries::new(points, &BLUE))?;

    root.present().context("flushing blockchain chart to disk")?;
    Ok(())
}
