use std::sync::Arc;

use crate::domain::planner::budget::{SearchBudget, SearchStatus};
use crate::domain::planner::config::PlannerConfig;
use crate::domain::planner::cube::Cube;
use crate::domain::planner::flow_state::PlanState;
use crate::domain::planner::observer::PlanObserver;
use crate::domain::planner::slice::Slice;
use crate::domain::planner::slice_planner::SlicePlanner;
use crate::domain::topology::network::Network;

/// Outcome of one build: the best plan found and how the search ended.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub cube: Cube,
    pub status: SearchStatus,

    /// Complete plans that were evaluated.
    pub leaves: usize,
}

/// Depth-first search over the horizon for the best-scoring plan.
pub struct CubeBuilder<'a> {
    network: &'a Network,
    config: &'a PlannerConfig,
    observer: Arc<dyn PlanObserver>,
    slice_planner: SlicePlanner<'a>,
}

/// Current root-to-node path of the search and the best complete plan so far.
struct BuildSearch {
    path: Vec<Slice>,
    best: Option<(f64, Vec<Slice>)>,
    budget: SearchBudget,
    exhausted_reported: bool,
}

impl<'a> CubeBuilder<'a> {
    pub fn new(network: &'a Network, config: &'a PlannerConfig, observer: Arc<dyn PlanObserver>) -> Self {
        let slice_planner = SlicePlanner::new(network, config, observer.clone());
        CubeBuilder { network, config, observer, slice_planner }
    }

    /// Explores up to `max_branching` slices per step until the leaf budget or the
    /// deadline runs out, then finishes the open branches greedily.
    pub fn build(&self) -> BuildReport {
        let builder_config = &self.config.cube_builder;
        let mut search = BuildSearch {
            path: Vec::with_capacity(self.network.horizon() as usize),
            best: None,
            budget: SearchBudget::new(Some(builder_config.max_leaves.max(1)), builder_config.time_limit_ms),
            exhausted_reported: false,
        };

        self.explore(0, PlanState::initial(self.network), 0.0, &mut search);

        let horizon = self.network.horizon();
        let cube = match search.best {
            Some((_, slices)) => Cube::from_slices(horizon, slices),
            None => Cube::empty(horizon),
        };
        let status = if search.exhausted_reported { SearchStatus::BudgetExhausted } else { SearchStatus::Complete };

        let report = BuildReport { cube, status, leaves: search.budget.used() };
        self.observer.cube_built(&report);
        report
    }

    fn explore(&self, t: u32, state: PlanState, score: f64, search: &mut BuildSearch) {
        let horizon = self.network.horizon();

        if t >= horizon || state.all_finished() {
            self.record_leaf(t, score, search);
            return;
        }

        let snapshot = self.network.capacity_snapshot(t);
        let slices = self.slice_planner.plan(t, &snapshot, &state);

        if slices.is_empty() {
            search.path.push(Slice::empty(t));
            self.explore(t + 1, state, score, search);
            search.path.pop();
            return;
        }

        for (i, slice) in slices.into_iter().take(self.config.cube_builder.max_branching.max(1)).enumerate() {
            if i > 0 && search.budget.is_exhausted() {
                if !search.exhausted_reported {
                    search.exhausted_reported = true;
                    self.observer.budget_exhausted("cube builder");
                }
                break;
            }

            let next_state = state.advanced_by(&slice);
            let next_score = score + slice.total_score();

            search.path.push(slice);
            self.explore(t + 1, next_state, next_score, search);
            search.path.pop();
        }
    }

    /// Pads the current path to the full horizon and keeps it if it beats the best plan.
    fn record_leaf(&self, t: u32, score: f64, search: &mut BuildSearch) {
        search.budget.consume();

        let improved = search.best.as_ref().is_none_or(|(best, _)| score > *best);
        if improved {
            let mut slices = search.path.clone();
            slices.extend((t..self.network.horizon()).map(Slice::empty));
            search.best = Some((score, slices));
        }
        self.observer.leaf_reached(score, improved);
    }
}
