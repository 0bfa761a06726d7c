//! EVCam capture planner - dry-run entry point
//!
//! Usage: `evcam-plan <topology-file>`

use anyhow::Context;
use capture_planner::{init_logging, plan, Topology};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("=== EVCam capture planner v{} ===", env!("CARGO_PKG_VERSION"));

    let path = std::env::args()
        .nth(1)
        .context("usage: evcam-plan <topology-file>")?;
    let topology = Topology::load(&path)?;
    let plan = plan(&topology);

    info!(
        "Planned {} of {} cameras in {} mode",
        plan.recording_count(),
        plan.cameras.len(),
        plan.classification.mode
    );
    println!("{}", serde_json::to_string_pretty(&plan)?);

    Ok(())
}
