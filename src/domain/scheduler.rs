use std::sync::Arc;
use std::time::Instant;

use crate::domain::planner::budget::SearchStatus;
use crate::domain::planner::config::PlannerConfig;
use crate::domain::planner::cube::Cube;
use crate::domain::planner::cube_builder::CubeBuilder;
use crate::domain::planner::cube_optimizer::{CubeOptimizer, OptimizerReport};
use crate::domain::planner::observer::PlanObserver;
use crate::domain::topology::network::Network;
use crate::error::{Error, Result};

/// `tracing` target of the one-line run summaries.
pub const ANALYTICS_TARGET: &str = "analytics";

/// Result of planning one network.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub cube: Cube,
    pub build_status: SearchStatus,

    /// `None` if the optimizer is disabled.
    pub optimizer: Option<OptimizerReport>,
}

impl ScheduleOutcome {
    pub fn total_score(&self) -> f64 {
        self.cube.total_score()
    }
}

/// Plans one network end to end: build, optimize, validate.
pub struct Scheduler {
    network: Network,
    config: PlannerConfig,
    observer: Arc<dyn PlanObserver>,
}

impl Scheduler {
    pub fn new(network: Network, config: PlannerConfig, observer: Arc<dyn PlanObserver>) -> Self {
        Scheduler { network, config, observer }
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Runs the planner. Fails on an empty horizon or if the plan breaks a node
    /// capacity or holds a malformed route.
    pub fn run(&self) -> Result<ScheduleOutcome> {
        if self.network.horizon() == 0 {
            return Err(Error::EmptyHorizon);
        }

        let started = Instant::now();
        log::info!(
            "Planning {} flows on a {}x{} grid over {} steps",
            self.network.flows().len(),
            self.network.width(),
            self.network.height(),
            self.network.horizon()
        );

        let build = CubeBuilder::new(&self.network, &self.config, self.observer.clone()).build();
        let build_score = build.cube.total_score();
        let mut cube = build.cube;

        let optimizer = if self.config.optimizer.enabled {
            Some(CubeOptimizer::new(&self.network, &self.config, self.observer.clone()).optimize(&mut cube))
        } else {
            None
        };

        cube.validate(&self.network)?;

        let served = self.network.flows().iter().filter(|f| cube.delivered(f.id) > 0.0).count();
        tracing::info!(
            target: ANALYTICS_TARGET,
            LogDescription = "Planning finished",
            Flows = self.network.flows().len(),
            FlowsServed = served,
            Horizon = self.network.horizon(),
            BuildScore = build_score,
            BuildStatus = ?build.status,
            BuildLeaves = build.leaves,
            OptimizerIterations = optimizer.as_ref().map(|r| r.iterations).unwrap_or(0),
            TotalScore = cube.total_score(),
            TotalQuantity = cube.total_quantity(),
            ProcessingTimeMs = started.elapsed().as_millis() as u64,
        );

        Ok(ScheduleOutcome { cube, build_status: build.status, optimizer })
    }
}
