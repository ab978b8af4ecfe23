use std::path::Path;
use std::sync::Arc;

use crate::domain::planner::config::PlannerConfig;
use crate::domain::planner::observer::PlanObserver;
use crate::domain::scheduler::{ScheduleOutcome, Scheduler};
use crate::domain::topology::network::Network;
use crate::error::Result;
use crate::loader::parser::load_network;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Loads the network stored at `file_path` and plans it.
pub fn plan_from_file(file_path: &Path, config: PlannerConfig, observer: Arc<dyn PlanObserver>) -> Result<(Network, ScheduleOutcome)> {
    let network = load_network(file_path)?;
    log::info!("Network '{}' loaded successfully.", file_path.display());

    let scheduler = Scheduler::new(network, config, observer);
    let outcome = scheduler.run()?;
    log::info!("Plan for '{}' constructed with score {:.2}.", file_path.display(), outcome.total_score());

    Ok((scheduler.into_network(), outcome))
}
