use crate::domain::planner::cube_builder::BuildReport;
use crate::domain::planner::cube_optimizer::{OptimizerReport, Rebalance};
use crate::domain::planner::efficiency_table::{ConfirmedTable, PotentialTable};
use crate::domain::planner::slice::Slice;

/// Receives progress events from the planning components.
///
/// Every method has an empty default, so an implementation only overrides what it
/// cares about. The components never print on their own.
pub trait PlanObserver: Send + Sync {
    fn slices_planned(&self, _t: u32, _active_flows: usize, _slices: &[Slice]) {}

    fn leaf_reached(&self, _score: f64, _improved: bool) {}

    /// A search ran out of leaves, iterations or time and continues best effort.
    fn budget_exhausted(&self, _component: &str) {}

    fn cube_built(&self, _report: &BuildReport) {}

    fn tables_built(&self, _iteration: usize, _confirmed: &ConfirmedTable, _potential: &PotentialTable) {}

    fn rebalanced(&self, _iteration: usize, _step: &Rebalance, _total_score: f64) {}

    fn optimizer_finished(&self, _report: &OptimizerReport) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl PlanObserver for SilentObserver {}

/// Forwards events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver {
    /// Also dump the efficiency tables of every optimizer iteration at trace level.
    pub dump_tables: bool,
}

impl PlanObserver for LogObserver {
    fn slices_planned(&self, t: u32, active_flows: usize, slices: &[Slice]) {
        let best = slices.first().map(|s| s.total_score()).unwrap_or(0.0);
        log::debug!("t={}: {} active flows, {} slices, best slice score {:.3}", t, active_flows, slices.len(), best);
    }

    fn leaf_reached(&self, score: f64, improved: bool) {
        if improved {
            log::debug!("New best plan with score {:.3}", score);
        }
    }

    fn budget_exhausted(&self, component: &str) {
        log::warn!("The {} ran out of budget. Continuing best effort.", component);
    }

    fn cube_built(&self, report: &BuildReport) {
        log::info!("Built plan with score {:.3} after {} leaves ({:?})", report.cube.total_score(), report.leaves, report.status);
        log::debug!("\n{}", report.cube.summary());
    }

    fn tables_built(&self, iteration: usize, confirmed: &ConfirmedTable, potential: &PotentialTable) {
        if self.dump_tables {
            log::trace!("Iteration {}\n{}\n{}", iteration, confirmed.render(), potential.render());
        }
    }

    fn rebalanced(&self, iteration: usize, step: &Rebalance, total_score: f64) {
        match step {
            Rebalance::Transfer { flow_id, donor_t, receiver_t, quantity } => {
                log::debug!("Iteration {}: moved {:.3} of flow {} from t={} to t={}, score {:.3}", iteration, quantity, flow_id, donor_t, receiver_t, total_score)
            }
            Rebalance::Replacement { flow_id, t } => {
                log::debug!("Iteration {}: rerouted flow {} at t={}, score {:.3}", iteration, flow_id, t, total_score)
            }
        }
    }

    fn optimizer_finished(&self, report: &OptimizerReport) {
        log::info!(
            "Optimizer finished ({:?}) after {} iterations: {} transfers, {} replacements, score {:.3} -> {:.3}",
            report.status,
            report.iterations,
            report.transfers,
            report.replacements,
            report.initial_score,
            report.final_score
        );
    }
}
