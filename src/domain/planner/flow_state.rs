use std::collections::BTreeMap;

use crate::domain::planner::slice::Slice;
use crate::domain::topology::capacity::CAPACITY_EPSILON;
use crate::domain::topology::coord::Coord;
use crate::domain::topology::network::Network;
use crate::domain::utils::id::FlowId;

/// Where a flow landed last and how often its landing coordinate changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowHistory {
    pub last_landing: Option<Coord>,
    pub landing_changes: u32,
}

impl FlowHistory {
    pub fn new(last_landing: Option<Coord>, landing_changes: u32) -> Self {
        FlowHistory { last_landing, landing_changes }
    }

    /// History after landing at `end`: a landing on a different coordinate than the last one counts as a change.
    pub fn after_landing(&self, end: Coord) -> FlowHistory {
        match self.last_landing {
            Some(last) if last != end => FlowHistory { last_landing: Some(end), landing_changes: self.landing_changes + 1 },
            _ => FlowHistory { last_landing: Some(end), landing_changes: self.landing_changes },
        }
    }
}

/// The evolving part of a flow during planning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowState {
    pub remaining: f64,
    pub history: FlowHistory,
}

/// Per-flow state at one point of the horizon.
///
/// Passed by value into every branch of the search: a branch updates its own copy,
/// siblings keep theirs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlanState {
    flows: BTreeMap<FlowId, FlowState>,
}

impl PlanState {
    /// Every flow with its full demand and no landing yet.
    pub fn initial(network: &Network) -> Self {
        let flows = network
            .flows()
            .iter()
            .map(|f| (f.id, FlowState { remaining: f.demand, history: FlowHistory::default() }))
            .collect();
        PlanState { flows }
    }

    pub fn remaining(&self, id: FlowId) -> f64 {
        self.flows.get(&id).map(|s| s.remaining).unwrap_or(0.0)
    }

    pub fn history(&self, id: FlowId) -> FlowHistory {
        self.flows.get(&id).map(|s| s.history).unwrap_or_default()
    }

    pub fn all_finished(&self) -> bool {
        self.flows.values().all(|s| s.remaining <= CAPACITY_EPSILON)
    }

    /// State after committing `slice`: demand decremented, landing history advanced.
    pub fn advanced_by(&self, slice: &Slice) -> PlanState {
        let mut next = self.clone();
        for ligne in slice.lignes() {
            if let Some(state) = next.flows.get_mut(&ligne.flow_id) {
                state.remaining = (state.remaining - ligne.quantity).max(0.0);
                if ligne.landed {
                    if let Some(end) = ligne.end() {
                        state.history = state.history.after_landing(end);
                    }
                }
            }
        }
        next
    }
}
