use std::collections::BTreeMap;
use std::fmt::Write;

use crate::domain::planner::config::ScoreConfig;
use crate::domain::planner::flow_state::FlowHistory;
use crate::domain::planner::scoring;
use crate::domain::planner::slice::Slice;
use crate::domain::topology::capacity::CAPACITY_EPSILON;
use crate::domain::topology::flow::Flow;
use crate::domain::topology::network::Network;
use crate::domain::utils::id::FlowId;
use crate::error::Result;

/// What a flow sent in one time step, identified by the endpoint of its route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmissionRecord {
    pub t: u32,
    pub x: i32,
    pub y: i32,
    pub q: f64,
}

/// A complete plan: one slice per time step of the horizon, `slices[t].t == t`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    slices: Vec<Slice>,
}

impl Cube {
    /// A plan where no flow transmits.
    pub fn empty(horizon: u32) -> Self {
        Cube { slices: (0..horizon).map(Slice::empty).collect() }
    }

    /// Builds a plan from slices ordered by time. Missing steps are filled with empty slices.
    pub fn from_slices(horizon: u32, slices: Vec<Slice>) -> Self {
        let mut cube = Cube::empty(horizon);
        for slice in slices {
            if let Some(existing) = cube.slice_mut(slice.t) {
                *existing = slice;
            }
        }
        cube
    }

    pub fn horizon(&self) -> u32 {
        self.slices.len() as u32
    }

    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    pub fn slice(&self, t: u32) -> Option<&Slice> {
        self.slices.get(t as usize)
    }

    pub fn slice_mut(&mut self, t: u32) -> Option<&mut Slice> {
        self.slices.get_mut(t as usize)
    }

    pub fn total_score(&self) -> f64 {
        self.slices.iter().fold(0.0, |acc, s| acc + s.total_score())
    }

    pub fn total_quantity(&self) -> f64 {
        self.slices.iter().fold(0.0, |acc, s| acc + s.total_quantity())
    }

    /// Total quantity sent by `flow_id` over the whole horizon.
    pub fn delivered(&self, flow_id: FlowId) -> f64 {
        self.delivered_before(flow_id, self.horizon())
    }

    /// Quantity sent by `flow_id` in the steps before `t`.
    pub fn delivered_before(&self, flow_id: FlowId, t: u32) -> f64 {
        self.slices.iter().take(t as usize).filter_map(|s| s.ligne_for(flow_id)).fold(0.0, |acc, l| acc + l.quantity)
    }

    /// Landing history of `flow_id` as the steps before `t` leave it.
    pub fn history_before(&self, flow_id: FlowId, t: u32) -> FlowHistory {
        self.slices
            .iter()
            .take(t as usize)
            .filter_map(|s| s.ligne_for(flow_id))
            .filter(|l| l.landed && l.quantity > CAPACITY_EPSILON)
            .filter_map(|l| l.end())
            .fold(FlowHistory::default(), |history, end| history.after_landing(end))
    }

    /// Recomputes the stored scores of `flow` in time order, each against the
    /// landing history the earlier steps of this plan leave behind.
    pub fn rescore_flow(&mut self, flow: &Flow, config: &ScoreConfig) {
        let mut history = FlowHistory::default();
        for slice in &mut self.slices {
            let Some(mut ligne) = slice.ligne_for(flow.id).cloned() else {
                continue;
            };

            ligne.score = scoring::ligne_score(config, flow, &ligne, &history);
            if ligne.landed && ligne.quantity > CAPACITY_EPSILON {
                if let Some(end) = ligne.end() {
                    history = history.after_landing(end);
                }
            }
            slice.replace(ligne);
        }
    }

    /// Per flow, one record per step in which the flow transmitted, ordered by time.
    pub fn records(&self) -> BTreeMap<FlowId, Vec<TransmissionRecord>> {
        let mut records: BTreeMap<FlowId, Vec<TransmissionRecord>> = BTreeMap::new();
        for slice in &self.slices {
            for ligne in slice.lignes() {
                if ligne.quantity <= CAPACITY_EPSILON {
                    continue;
                }
                if let Some(end) = ligne.end() {
                    records.entry(ligne.flow_id).or_default().push(TransmissionRecord { t: slice.t, x: end.x, y: end.y, q: ligne.quantity });
                }
            }
        }
        records
    }

    /// Checks every slice against the capacities of `network`.
    pub fn validate(&self, network: &Network) -> Result<()> {
        for slice in &self.slices {
            slice.validate(&network.capacity_snapshot(slice.t))?;
        }
        Ok(())
    }

    /// Per-step table of flows, quantity and score followed by the total.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:>4} | {:>5} | {:>10} | {:>10}", "t", "flows", "quantity", "score");
        let _ = writeln!(out, "{}", "-".repeat(38));
        for slice in &self.slices {
            let _ = writeln!(out, "{:>4} | {:>5} | {:>10.2} | {:>10.3}", slice.t, slice.lignes().len(), slice.total_quantity(), slice.total_score());
        }
        let _ = writeln!(out, "{}", "-".repeat(38));
        let _ = writeln!(out, "{:>4} | {:>5} | {:>10.2} | {:>10.3}", "sum", "", self.total_quantity(), self.total_score());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::planner::ligne::Ligne;
    use crate::domain::topology::coord::Coord;
    use crate::domain::topology::flow::LandingRect;

    fn ligne(t: u32, end: Coord, quantity: f64) -> Ligne {
        Ligne { flow_id: FlowId::new(1), t, route: vec![Coord::new(0, 0), end], bottleneck: quantity, quantity, landed: true, score: quantity * 5.0 }
    }

    #[test]
    fn test_records_and_history() {
        let slices = vec![
            Slice::new(0, vec![ligne(0, Coord::new(1, 0), 4.0)]),
            Slice::new(2, vec![ligne(2, Coord::new(0, 1), 2.0)]),
            Slice::new(3, vec![ligne(3, Coord::new(1, 0), 1.0)]),
        ];
        let cube = Cube::from_slices(5, slices);

        assert_eq!(cube.horizon(), 5);
        assert!(cube.slice(1).is_some_and(|s| s.is_empty()));

        let records = &cube.records()[&FlowId::new(1)];
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], TransmissionRecord { t: 2, x: 0, y: 1, q: 2.0 });

        assert_eq!(cube.history_before(FlowId::new(1), 0), FlowHistory::default());
        assert_eq!(cube.history_before(FlowId::new(1), 2), FlowHistory::new(Some(Coord::new(1, 0)), 0));
        assert_eq!(cube.history_before(FlowId::new(1), 5), FlowHistory::new(Some(Coord::new(1, 0)), 2));

        assert_eq!(cube.delivered(FlowId::new(1)), 7.0);
        assert_eq!(cube.delivered_before(FlowId::new(1), 2), 4.0);
        assert_eq!(cube.total_score(), 35.0);
    }

    #[test]
    fn test_summary_lists_every_step() {
        let cube = Cube::empty(3);
        let summary = cube.summary();
        assert_eq!(summary.lines().count(), 3 + 4);
        assert!(summary.contains("sum"));
        assert!(!summary.contains("-0.0"), "empty steps print a plain zero:\n{}", summary);
        assert!(cube.total_score().is_sign_positive());
    }

    #[test]
    fn test_rescore_gives_first_landing_bonus_once() {
        let config = ScoreConfig::default();
        let flow = Flow::new(FlowId::new(1), Coord::new(0, 0), 0, 12.0, LandingRect::new(1, 0, 1, 1));
        let slices = vec![
            Slice::new(1, vec![ligne(1, Coord::new(1, 0), 4.0)]),
            Slice::new(2, vec![ligne(2, Coord::new(1, 0), 4.0)]),
            Slice::new(3, vec![ligne(3, Coord::new(1, 1), 4.0)]),
        ];
        let mut cube = Cube::from_slices(4, slices);

        cube.rescore_flow(&flow, &config);

        let score = |t: u32| cube.slice(t).and_then(|s| s.ligne_for(flow.id)).map(|l| l.score).unwrap_or(0.0);
        let base = |t: u32| scoring::base_score(&config, 12.0, 4.0, t, 1.0);
        assert!((score(1) - base(1) - config.first_landing_bonus).abs() < 1e-9);
        assert!((score(2) - base(2)).abs() < 1e-9, "same landing as before");
        assert!((score(3) - base(3) + scoring::landing_change_penalty(&config, 2)).abs() < 1e-9, "first change");

        let before = cube.clone();
        cube.rescore_flow(&flow, &config);
        assert_eq!(cube, before);
    }
}
