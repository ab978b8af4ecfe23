use std::sync::Arc;

use crate::domain::planner::budget::SearchStatus;
use crate::domain::planner::config::PlannerConfig;
use crate::domain::planner::flow_state::PlanState;
use crate::domain::planner::ligne::Ligne;
use crate::domain::planner::ligne_finder::LigneFinder;
use crate::domain::planner::observer::PlanObserver;
use crate::domain::planner::slice::Slice;
use crate::domain::topology::capacity::{CAPACITY_EPSILON, CapacitySnapshot};
use crate::domain::topology::flow::Flow;
use crate::domain::topology::network::Network;

/// Joint allocation of all active flows at one time step.
///
/// Flows are assigned one after another, each against the capacity the previously
/// assigned flows left over, so every produced slice respects node capacities by
/// construction.
pub struct SlicePlanner<'a> {
    network: &'a Network,
    config: &'a PlannerConfig,
    observer: Arc<dyn PlanObserver>,
}

/// Enumeration state shared by all orderings of one `plan` call.
struct Assignment<'s> {
    t: u32,
    state: &'s PlanState,
    chosen: Vec<Ligne>,
    complete: Vec<Slice>,

    /// Some path search hit `max_expansions`.
    search_capped: bool,
}

impl<'a> SlicePlanner<'a> {
    pub fn new(network: &'a Network, config: &'a PlannerConfig, observer: Arc<dyn PlanObserver>) -> Self {
        SlicePlanner { network, config, observer }
    }

    /// Flows that have started by `t` and still have demand left.
    pub fn active_flows(&self, t: u32, state: &PlanState) -> Vec<&'a Flow> {
        self.network.flows().iter().filter(|f| f.is_active_at(t) && state.remaining(f.id) > CAPACITY_EPSILON).collect()
    }

    /// Ranked feasible slices for time `t`, best aggregate score first.
    ///
    /// `snapshot` is the capacity available at `t`. Returns an empty `Vec` when no
    /// flow is active or none can transmit; slices in which some flows receive
    /// nothing are valid results. Hitting a search cap is reported to the observer.
    pub fn plan(&self, t: u32, snapshot: &CapacitySnapshot, state: &PlanState) -> Vec<Slice> {
        let active = self.active_flows(t, state);
        if active.is_empty() {
            return Vec::new();
        }

        let mut assignment = Assignment { t, state, chosen: Vec::new(), complete: Vec::new(), search_capped: false };
        let greedy = self.greedy_order(active, snapshot, &mut assignment);

        if self.enumerates_orderings(greedy.len()) {
            let mut indices: Vec<usize> = (0..greedy.len()).collect();
            loop {
                let order: Vec<&Flow> = indices.iter().map(|i| greedy[*i]).collect();
                self.assign(&order, 0, snapshot, &mut assignment);
                if !next_permutation(&mut indices) || self.enumeration_full(&assignment) {
                    break;
                }
            }
        } else {
            self.assign(&greedy, 0, snapshot, &mut assignment);
        }

        if assignment.search_capped {
            self.observer.budget_exhausted("path search");
        }
        if self.enumeration_full(&assignment) {
            self.observer.budget_exhausted("slice planner");
        }

        let slices = self.rank(assignment.complete);
        self.observer.slices_planned(t, greedy.len(), &slices);
        slices
    }

    /// Every ordering is tried below `permutation_threshold` active flows.
    fn enumerates_orderings(&self, active: usize) -> bool {
        active < self.config.slice_planner.permutation_threshold
    }

    fn search(&self, flow: &Flow, snapshot: &CapacitySnapshot, assignment: &mut Assignment) -> Vec<Ligne> {
        let finder = LigneFinder::new(flow, assignment.t, snapshot, assignment.state.history(flow.id), assignment.state.remaining(flow.id), self.config);
        let (candidates, status) = finder.run_with_status();
        if status == SearchStatus::BudgetExhausted {
            assignment.search_capped = true;
        }
        candidates
    }

    /// Orders flows by the average score of their candidates against the unmodified
    /// snapshot, highest first. Flows without candidates come last, ties go by id.
    fn greedy_order(&self, active: Vec<&'a Flow>, snapshot: &CapacitySnapshot, assignment: &mut Assignment) -> Vec<&'a Flow> {
        let mut scored: Vec<(f64, &'a Flow)> = active
            .into_iter()
            .map(|flow| {
                let candidates = self.search(flow, snapshot, assignment);
                let average = if candidates.is_empty() {
                    f64::NEG_INFINITY
                } else {
                    candidates.iter().map(|c| c.score).sum::<f64>() / candidates.len() as f64
                };
                (average, flow)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        scored.into_iter().map(|(_, flow)| flow).collect()
    }

    fn enumeration_full(&self, assignment: &Assignment) -> bool {
        assignment.complete.len() >= self.config.slice_planner.max_assignments
    }

    /// Assigns `order[pos..]` against `snapshot`, the capacity left by `order[..pos]`.
    fn assign(&self, order: &[&Flow], pos: usize, snapshot: &CapacitySnapshot, assignment: &mut Assignment) {
        if self.enumeration_full(assignment) {
            return;
        }

        let Some(flow) = order.get(pos) else {
            assignment.complete.push(Slice::new(assignment.t, assignment.chosen.clone()));
            return;
        };

        let mut candidates = self.search(flow, snapshot, assignment);
        candidates.retain(|c| c.quantity > CAPACITY_EPSILON);
        candidates.truncate(self.config.slice_planner.branch_candidates.max(1));

        if candidates.is_empty() {
            self.assign(order, pos + 1, snapshot, assignment);
            return;
        }

        for candidate in candidates {
            let mut depleted = snapshot.clone();
            depleted.deduct(&candidate.route, candidate.quantity);

            assignment.chosen.push(candidate);
            self.assign(order, pos + 1, &depleted, assignment);
            assignment.chosen.pop();
        }
    }

    /// Drops empty and duplicate slices, sorts by score then quantity and keeps the beam.
    fn rank(&self, complete: Vec<Slice>) -> Vec<Slice> {
        let mut unique: Vec<Slice> = Vec::new();
        for slice in complete {
            if !slice.is_empty() && !unique.iter().any(|u| u.is_same_as(&slice)) {
                unique.push(slice);
            }
        }

        unique.sort_by(|a, b| b.total_score().total_cmp(&a.total_score()).then_with(|| b.total_quantity().total_cmp(&a.total_quantity())));
        unique.truncate(self.config.slice_planner.beam_width.max(1));
        unique
    }
}

/// Rearranges `indices` into the next lexicographic permutation. Returns `false`
/// once the last permutation was reached.
fn next_permutation(indices: &mut [usize]) -> bool {
    if indices.len() < 2 {
        return false;
    }

    let mut i = indices.len() - 1;
    while i > 0 && indices[i - 1] >= indices[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }

    let mut j = indices.len() - 1;
    while indices[j] <= indices[i - 1] {
        j -= 1;
    }
    indices.swap(i - 1, j);
    indices[i..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::planner::observer::SilentObserver;
    use std::sync::Mutex;
    use crate::domain::topology::coord::Coord;
    use crate::domain::topology::flow::LandingRect;
    use crate::domain::utils::id::FlowId;

    #[test]
    fn test_permutations_in_lexicographic_order() {
        let mut indices = vec![0, 1, 2];
        let mut seen = vec![indices.clone()];
        while next_permutation(&mut indices) {
            seen.push(indices.clone());
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[1], vec![0, 2, 1]);
        assert_eq!(seen[5], vec![2, 1, 0]);
        assert!(!next_permutation(&mut [7]));
    }

    #[test]
    fn test_no_active_flow_gives_no_slice() {
        let flow = Flow::new(FlowId::new(1), Coord::new(0, 0), 3, 10.0, LandingRect::new(1, 0, 1, 0));
        let network = Network::with_uniform_nodes(2, 1, 6, 10.0, 3, vec![flow]).unwrap();
        let config = PlannerConfig::default();
        let planner = SlicePlanner::new(&network, &config, Arc::new(SilentObserver));
        let state = PlanState::initial(&network);

        assert!(planner.plan(0, &network.capacity_snapshot(0), &state).is_empty(), "flow starts at t=3");
        assert_eq!(planner.active_flows(3, &state).len(), 1);
    }

    #[test]
    fn test_greedy_order_only_above_threshold() {
        let flows = (1..=3).map(|i| Flow::new(FlowId::new(i), Coord::new(0, i as i32 - 1), 0, 10.0, LandingRect::new(2, 0, 2, 2))).collect();
        let network = Network::with_uniform_nodes(3, 3, 4, 10.0, 3, flows).unwrap();
        let mut config = PlannerConfig::default();
        config.slice_planner.permutation_threshold = 1;
        let planner = SlicePlanner::new(&network, &config, Arc::new(SilentObserver));

        let slices = planner.plan(0, &network.capacity_snapshot(0), &PlanState::initial(&network));

        assert!(!slices.is_empty());
        assert!(slices.len() <= config.slice_planner.beam_width);
        for pair in slices.windows(2) {
            assert!(pair[0].total_score() >= pair[1].total_score(), "slices must be ranked by score");
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let network = Network::with_uniform_nodes(2, 1, 4, 10.0, 3, Vec::new()).unwrap();
        let mut config = PlannerConfig::default();
        config.slice_planner.permutation_threshold = 3;
        let planner = SlicePlanner::new(&network, &config, Arc::new(SilentObserver));

        assert!(planner.enumerates_orderings(2));
        assert!(!planner.enumerates_orderings(3));
    }

    #[derive(Default)]
    struct CapRecorder {
        components: Mutex<Vec<String>>,
    }

    impl PlanObserver for CapRecorder {
        fn budget_exhausted(&self, component: &str) {
            self.components.lock().unwrap().push(component.to_string());
        }
    }

    #[test]
    fn test_search_caps_reported() {
        let flows = (1..=2).map(|i| Flow::new(FlowId::new(i), Coord::new(0, i as i32 - 1), 0, 10.0, LandingRect::new(3, 0, 3, 1))).collect();
        let network = Network::with_uniform_nodes(4, 2, 4, 10.0, 3, flows).unwrap();
        let state = PlanState::initial(&network);
        let snapshot = network.capacity_snapshot(0);

        let recorder = Arc::new(CapRecorder::default());
        let config = PlannerConfig::default();
        SlicePlanner::new(&network, &config, recorder.clone()).plan(0, &snapshot, &state);
        assert!(recorder.components.lock().unwrap().is_empty());

        let mut capped = PlannerConfig::default();
        capped.search.max_expansions = 1;
        capped.slice_planner.max_assignments = 1;
        let recorder = Arc::new(CapRecorder::default());
        SlicePlanner::new(&network, &capped, recorder.clone()).plan(0, &snapshot, &state);

        let components = recorder.components.lock().unwrap();
        assert!(components.contains(&"path search".to_string()));
        assert!(components.contains(&"slice planner".to_string()));
    }
}
