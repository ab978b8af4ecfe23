use std::sync::Arc;

use crate::domain::planner::budget::SearchBudget;
use crate::domain::planner::config::{OwnUsagePolicy, PlannerConfig};
use crate::domain::planner::cube::Cube;
use crate::domain::planner::efficiency_table::{ConfirmedTable, PotentialTable};
use crate::domain::planner::ligne_finder::LigneFinder;
use crate::domain::planner::observer::PlanObserver;
use crate::domain::topology::network::Network;
use crate::domain::utils::id::FlowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerStatus {
    /// No gap left that would raise the total score.
    Converged,
    IterationCap,
    DeadlineReached,
    Disabled,
}

/// A change the optimizer committed to the plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rebalance {
    /// `quantity` of the flow moved from `donor_t` to `receiver_t`.
    Transfer { flow_id: FlowId, donor_t: u32, receiver_t: u32, quantity: f64 },

    /// The flow's route at `t` replaced by a better one carrying the same quantity.
    Replacement { flow_id: FlowId, t: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerReport {
    pub status: OptimizerStatus,
    pub iterations: usize,
    pub transfers: usize,
    pub replacements: usize,
    pub initial_score: f64,
    pub final_score: f64,
}

/// A cell whose potential efficiency beats the flow's weakest confirmed step.
#[derive(Debug, Clone, Copy)]
struct Gap {
    flow_id: FlowId,
    t: u32,
    donor_t: u32,
    gap: f64,

    /// Extra quantity the cell could carry compared to the plan.
    capacity_gain: f64,
}

/// Moves allocation of a flow from its least efficient step to steps where it
/// could do better, one committed change per iteration.
pub struct CubeOptimizer<'a> {
    network: &'a Network,
    config: &'a PlannerConfig,
    observer: Arc<dyn PlanObserver>,
}

impl<'a> CubeOptimizer<'a> {
    pub fn new(network: &'a Network, config: &'a PlannerConfig, observer: Arc<dyn PlanObserver>) -> Self {
        CubeOptimizer { network, config, observer }
    }

    /// Improves `cube` in place. Only changes that raise the total score are kept,
    /// so the score never decreases and node capacities stay respected.
    ///
    /// Stored scores are first brought in line with each flow's landing history;
    /// `initial_score` is the total after that.
    pub fn optimize(&self, cube: &mut Cube) -> OptimizerReport {
        let settings = &self.config.optimizer;
        let mut report = OptimizerReport {
            status: OptimizerStatus::IterationCap,
            iterations: 0,
            transfers: 0,
            replacements: 0,
            initial_score: cube.total_score(),
            final_score: cube.total_score(),
        };

        if !settings.enabled {
            report.status = OptimizerStatus::Disabled;
            return report;
        }

        for flow in self.network.flows() {
            cube.rescore_flow(flow, &self.config.score);
        }
        report.initial_score = cube.total_score();

        let budget = SearchBudget::new(None, settings.time_limit_ms);

        for iteration in 0..settings.max_iterations {
            if budget.deadline_passed() {
                report.status = OptimizerStatus::DeadlineReached;
                self.observer.budget_exhausted("cube optimizer");
                break;
            }
            report.iterations += 1;

            let confirmed = ConfirmedTable::from_cube(cube, self.network);
            let potential = PotentialTable::build(self.network, cube, &confirmed, self.config);
            self.observer.tables_built(iteration, &confirmed, &potential);

            let current = cube.total_score();
            let applied = self
                .rank_gaps(&confirmed, &potential)
                .into_iter()
                .filter_map(|gap| self.attempt(cube, &confirmed, &gap))
                .find(|(next, _)| next.total_score() > current + settings.gap_tolerance);

            let Some((next, step)) = applied else {
                report.status = OptimizerStatus::Converged;
                break;
            };

            match step {
                Rebalance::Transfer { .. } => report.transfers += 1,
                Rebalance::Replacement { .. } => report.replacements += 1,
            }
            *cube = next;
            self.observer.rebalanced(iteration, &step, cube.total_score());
        }

        report.final_score = cube.total_score();
        self.observer.optimizer_finished(&report);
        report
    }

    /// Gaps above tolerance, those with a real capacity gain first, then by size.
    fn rank_gaps(&self, confirmed: &ConfirmedTable, potential: &PotentialTable) -> Vec<Gap> {
        let settings = &self.config.optimizer;
        let mut gaps = Vec::new();

        for flow_id in confirmed.flows() {
            let Some((donor_t, lowest)) = confirmed.lowest_efficiency(*flow_id) else {
                continue;
            };

            for t in 0..confirmed.horizon() {
                let Some(cell) = potential.cell(*flow_id, t) else {
                    continue;
                };

                let gap = cell.efficiency() - lowest;
                if gap <= settings.gap_tolerance {
                    continue;
                }

                let capacity_gain = match settings.own_usage_policy {
                    OwnUsagePolicy::Removable => cell.quantity - confirmed.quantity(*flow_id, t),
                    OwnUsagePolicy::Masked => cell.quantity,
                };
                gaps.push(Gap { flow_id: *flow_id, t, donor_t, gap, capacity_gain: capacity_gain.max(0.0) });
            }
        }

        let eps = settings.quantity_epsilon;
        gaps.sort_by(|a, b| {
            (b.capacity_gain > eps)
                .cmp(&(a.capacity_gain > eps))
                .then_with(|| b.gap.total_cmp(&a.gap))
                .then_with(|| a.flow_id.cmp(&b.flow_id))
                .then_with(|| a.t.cmp(&b.t))
        });
        gaps
    }

    /// The plan after acting on `gap`, or `None` if nothing feasible came out of it.
    fn attempt(&self, cube: &Cube, confirmed: &ConfirmedTable, gap: &Gap) -> Option<(Cube, Rebalance)> {
        let delta = confirmed.quantity(gap.flow_id, gap.donor_t).min(gap.capacity_gain);

        if gap.t != gap.donor_t && delta > self.config.optimizer.quantity_epsilon {
            self.transfer(cube, gap.flow_id, gap.donor_t, gap.t, delta)
        } else {
            self.replace_in_place(cube, gap.flow_id, gap.t)
        }
    }

    /// Reroutes the flow at `receiver_t` for up to `delta` more and takes what it
    /// actually gained away from `donor_t`. The flow's other steps are rescored, as
    /// moving a landing changes the history they see.
    fn transfer(&self, cube: &Cube, flow_id: FlowId, donor_t: u32, receiver_t: u32, delta: f64) -> Option<(Cube, Rebalance)> {
        let eps = self.config.optimizer.quantity_epsilon;
        let flow = self.network.flow(flow_id)?;

        let old_quantity = cube.slice(receiver_t)?.ligne_for(flow_id).map(|l| l.quantity).unwrap_or(0.0);
        let snapshot = PotentialTable::snapshot_for(self.network, cube, flow_id, receiver_t, OwnUsagePolicy::Removable);
        let history = cube.history_before(flow_id, receiver_t);

        let best = LigneFinder::new(flow, receiver_t, &snapshot, history, old_quantity + delta, self.config).run().into_iter().next()?;
        let moved = best.quantity - old_quantity;
        if moved <= eps {
            return None;
        }

        let mut next = cube.clone();
        next.slice_mut(receiver_t)?.replace(best);

        let donor_slice = next.slice_mut(donor_t)?;
        let donor = donor_slice.ligne_for(flow_id)?.clone();
        let left = donor.quantity - moved;
        if left <= eps {
            donor_slice.remove(flow_id);
        } else {
            donor_slice.replace(donor.scaled_to(left));
        }
        next.rescore_flow(flow, &self.config.score);

        Some((next, Rebalance::Transfer { flow_id, donor_t, receiver_t, quantity: moved }))
    }

    /// Swaps the flow's route at `t` for the best one carrying the same quantity.
    fn replace_in_place(&self, cube: &Cube, flow_id: FlowId, t: u32) -> Option<(Cube, Rebalance)> {
        let eps = self.config.optimizer.quantity_epsilon;
        let flow = self.network.flow(flow_id)?;
        let current = cube.slice(t)?.ligne_for(flow_id)?.clone();
        if current.quantity <= eps {
            return None;
        }

        let snapshot = PotentialTable::snapshot_for(self.network, cube, flow_id, t, OwnUsagePolicy::Removable);
        let history = cube.history_before(flow_id, t);

        let best = LigneFinder::new(flow, t, &snapshot, history, current.quantity, self.config)
            .run()
            .into_iter()
            .find(|l| l.quantity >= current.quantity - eps)?;
        if best.score <= current.score + self.config.optimizer.gap_tolerance {
            return None;
        }

        let mut next = cube.clone();
        next.slice_mut(t)?.replace(best);
        next.rescore_flow(flow, &self.config.score);
        Some((next, Rebalance::Replacement { flow_id, t }))
    }
}
