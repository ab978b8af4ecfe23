//! Flow × time tables compared by the cube optimizer.
//!
//! The confirmed table reads what the current plan allocates. The potential table
//! records, per cell, the best score per unit a flow could reach if it were routed
//! again with the other flows' usage left in place.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::domain::planner::config::{OwnUsagePolicy, PlannerConfig};
use crate::domain::planner::cube::Cube;
use crate::domain::planner::flow_state::FlowHistory;
use crate::domain::planner::ligne::Ligne;
use crate::domain::planner::ligne_finder::LigneFinder;
use crate::domain::topology::capacity::{CAPACITY_EPSILON, CapacitySnapshot};
use crate::domain::topology::coord::Coord;
use crate::domain::topology::network::Network;
use crate::domain::utils::id::FlowId;

/// Allocation of one flow at one step, as the plan has it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmedCell {
    pub quantity: f64,
    pub score: f64,

    /// Endpoint of the route if it landed.
    pub landing: Option<Coord>,

    /// Demand still open after this step.
    pub remaining_after: f64,
}

impl ConfirmedCell {
    pub fn efficiency(&self) -> f64 {
        if self.quantity > CAPACITY_EPSILON { self.score / self.quantity } else { 0.0 }
    }

    pub fn is_transmitting(&self) -> bool {
        self.quantity > CAPACITY_EPSILON
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedTable {
    horizon: u32,
    flows: Vec<FlowId>,
    cells: BTreeMap<(FlowId, u32), ConfirmedCell>,
    histories: BTreeMap<(FlowId, u32), FlowHistory>,
}

impl ConfirmedTable {
    /// One cell per flow and step of `cube`, idle steps included.
    pub fn from_cube(cube: &Cube, network: &Network) -> Self {
        let horizon = cube.horizon();
        let mut cells = BTreeMap::new();
        let mut histories = BTreeMap::new();

        for flow in network.flows() {
            let mut remaining = flow.demand;
            let mut history = FlowHistory::default();

            for t in 0..horizon {
                histories.insert((flow.id, t), history);

                let ligne = cube.slice(t).and_then(|s| s.ligne_for(flow.id));
                let (quantity, score, landing) = match ligne {
                    Some(l) if l.quantity > CAPACITY_EPSILON => (l.quantity, l.score, if l.landed { l.end() } else { None }),
                    _ => (0.0, 0.0, None),
                };

                remaining = (remaining - quantity).max(0.0);
                if let Some(end) = landing {
                    history = history.after_landing(end);
                }

                cells.insert((flow.id, t), ConfirmedCell { quantity, score, landing, remaining_after: remaining });
            }
        }

        ConfirmedTable { horizon, flows: network.flows().iter().map(|f| f.id).collect(), cells, histories }
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    pub fn flows(&self) -> &[FlowId] {
        &self.flows
    }

    pub fn cell(&self, flow_id: FlowId, t: u32) -> Option<&ConfirmedCell> {
        self.cells.get(&(flow_id, t))
    }

    pub fn quantity(&self, flow_id: FlowId, t: u32) -> f64 {
        self.cell(flow_id, t).map(|c| c.quantity).unwrap_or(0.0)
    }

    /// Landing history of the flow as the steps before `t` leave it.
    pub fn history_before(&self, flow_id: FlowId, t: u32) -> FlowHistory {
        self.histories.get(&(flow_id, t)).copied().unwrap_or_default()
    }

    /// The transmitting step with the lowest efficiency, earliest on ties.
    pub fn lowest_efficiency(&self, flow_id: FlowId) -> Option<(u32, f64)> {
        (0..self.horizon)
            .filter_map(|t| self.cell(flow_id, t).filter(|c| c.is_transmitting()).map(|c| (t, c.efficiency())))
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
    }

    /// Efficiency grid, one row per flow.
    pub fn render(&self) -> String {
        render_grid("confirmed", self.horizon, &self.flows, |flow, t| self.cell(flow, t).filter(|c| c.is_transmitting()).map(|c| c.efficiency()))
    }
}

/// Best candidate of each flow at each step under the other flows' current usage.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialTable {
    horizon: u32,
    flows: Vec<FlowId>,
    cells: BTreeMap<(FlowId, u32), Ligne>,
}

impl PotentialTable {
    /// Runs one path search per flow and step.
    ///
    /// The flow may send up to its whole demand, so a cell shows the capacity the
    /// step could offer it. Under [`OwnUsagePolicy::Masked`] the flow's own confirmed
    /// usage is subtracted as well.
    pub fn build(network: &Network, cube: &Cube, confirmed: &ConfirmedTable, config: &PlannerConfig) -> Self {
        let mut cells = BTreeMap::new();

        for flow in network.flows() {
            for t in flow.start_time..cube.horizon() {
                let snapshot = Self::snapshot_for(network, cube, flow.id, t, config.optimizer.own_usage_policy);
                let history = confirmed.history_before(flow.id, t);

                let best = LigneFinder::new(flow, t, &snapshot, history, flow.demand, config)
                    .run()
                    .into_iter()
                    .filter(|l| l.quantity > config.optimizer.quantity_epsilon)
                    .max_by(|a, b| a.efficiency().total_cmp(&b.efficiency()).then_with(|| b.hops().cmp(&a.hops())));

                if let Some(ligne) = best {
                    cells.insert((flow.id, t), ligne);
                }
            }
        }

        PotentialTable { horizon: cube.horizon(), flows: network.flows().iter().map(|f| f.id).collect(), cells }
    }

    /// Capacity at `t` minus the usage of every other flow in `cube`, and minus the
    /// flow's own usage when `policy` masks it.
    pub fn snapshot_for(network: &Network, cube: &Cube, flow_id: FlowId, t: u32, policy: OwnUsagePolicy) -> CapacitySnapshot {
        let mut snapshot = network.capacity_snapshot(t);
        if let Some(slice) = cube.slice(t) {
            let usage = match policy {
                OwnUsagePolicy::Removable => slice.usage_excluding(flow_id),
                OwnUsagePolicy::Masked => slice.usage(),
            };
            snapshot.subtract_usage(&usage);
        }
        snapshot
    }

    pub fn cell(&self, flow_id: FlowId, t: u32) -> Option<&Ligne> {
        self.cells.get(&(flow_id, t))
    }

    pub fn render(&self) -> String {
        render_grid("potential", self.horizon, &self.flows, |flow, t| self.cell(flow, t).map(|l| l.efficiency()))
    }
}

fn render_grid(title: &str, horizon: u32, flows: &[FlowId], value: impl Fn(FlowId, u32) -> Option<f64>) -> String {
    let mut out = String::new();
    let _ = write!(out, "{:>10}", title);
    for t in 0..horizon {
        let _ = write!(out, " {:>7}", t);
    }
    let _ = writeln!(out);

    for flow in flows {
        let _ = write!(out, "{:>10}", format!("flow {}", flow));
        for t in 0..horizon {
            match value(*flow, t) {
                Some(v) => {
                    let _ = write!(out, " {:>7.3}", v);
                }
                None => {
                    let _ = write!(out, " {:>7}", ".");
                }
            }
        }
        let _ = writeln!(out);
    }
    out
}
