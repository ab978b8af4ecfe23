use std::collections::BTreeMap;

use crate::domain::planner::ligne::Ligne;
use crate::domain::topology::capacity::CapacitySnapshot;
use crate::domain::topology::coord::Coord;
use crate::domain::utils::id::FlowId;
use crate::error::{Error, Result};

/// Per-flow scores closer than this are considered equal when comparing slices.
const SCORE_TOLERANCE: f64 = 1e-6;

/// Usage above capacity by more than this is reported as a violation.
const USAGE_TOLERANCE: f64 = 1e-6;

/// The chosen paths of one time step, at most one per flow, kept sorted by flow id.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub t: u32,
    lignes: Vec<Ligne>,
}

impl Slice {
    pub fn empty(t: u32) -> Self {
        Slice { t, lignes: Vec::new() }
    }

    /// Builds a slice from `lignes`. A later ligne of the same flow replaces an earlier one.
    pub fn new(t: u32, lignes: Vec<Ligne>) -> Self {
        let mut slice = Slice::empty(t);
        for ligne in lignes {
            slice.replace(ligne);
        }
        slice
    }

    pub fn lignes(&self) -> &[Ligne] {
        &self.lignes
    }

    pub fn is_empty(&self) -> bool {
        self.lignes.is_empty()
    }

    pub fn total_score(&self) -> f64 {
        self.lignes.iter().fold(0.0, |acc, l| acc + l.score)
    }

    pub fn total_quantity(&self) -> f64 {
        self.lignes.iter().fold(0.0, |acc, l| acc + l.quantity)
    }

    pub fn ligne_for(&self, flow_id: FlowId) -> Option<&Ligne> {
        self.position(flow_id).ok().map(|i| &self.lignes[i])
    }

    /// Inserts `ligne`, replacing the flow's current ligne if there is one.
    pub fn replace(&mut self, ligne: Ligne) {
        match self.position(ligne.flow_id) {
            Ok(i) => self.lignes[i] = ligne,
            Err(i) => self.lignes.insert(i, ligne),
        }
    }

    pub fn remove(&mut self, flow_id: FlowId) -> Option<Ligne> {
        self.position(flow_id).ok().map(|i| self.lignes.remove(i))
    }

    fn position(&self, flow_id: FlowId) -> std::result::Result<usize, usize> {
        self.lignes.binary_search_by(|l| l.flow_id.cmp(&flow_id))
    }

    /// Aggregate quantity routed through each coordinate.
    pub fn usage(&self) -> BTreeMap<Coord, f64> {
        self.usage_where(|_| true)
    }

    /// Aggregate quantity routed through each coordinate by every flow except `flow_id`.
    pub fn usage_excluding(&self, flow_id: FlowId) -> BTreeMap<Coord, f64> {
        self.usage_where(|l| l.flow_id != flow_id)
    }

    fn usage_where(&self, keep: impl Fn(&Ligne) -> bool) -> BTreeMap<Coord, f64> {
        let mut usage = BTreeMap::new();
        for ligne in self.lignes.iter().filter(|l| keep(l)) {
            for c in &ligne.route {
                *usage.entry(*c).or_insert(0.0) += ligne.quantity;
            }
        }
        usage
    }

    /// Same flows with per-flow scores within tolerance.
    pub fn is_same_as(&self, other: &Slice) -> bool {
        self.lignes.len() == other.lignes.len()
            && self
                .lignes
                .iter()
                .zip(&other.lignes)
                .all(|(a, b)| a.flow_id == b.flow_id && (a.score - b.score).abs() <= SCORE_TOLERANCE)
    }

    /// Checks that every route is a simple 4-connected path and that no coordinate
    /// carries more than `capacity` allows.
    ///
    /// `capacity` is the full capacity of the network at `self.t`, before any usage.
    pub fn validate(&self, capacity: &CapacitySnapshot) -> Result<()> {
        if let Some(ligne) = self.lignes.iter().find(|l| !l.is_well_formed()) {
            log::error!("Slice at t={} holds a malformed route for flow {}: {:?}", self.t, ligne.flow_id, ligne.route);
            return Err(Error::MalformedRoute { t: self.t, flow: ligne.flow_id.into() });
        }

        for (c, usage) in self.usage() {
            let available = capacity.get(&c);
            if usage > available + USAGE_TOLERANCE {
                log::error!("Slice at t={} overbooks node {}: usage {} > capacity {}", self.t, c, usage, available);
                return Err(Error::CapacityViolation { t: self.t, x: c.x, y: c.y, usage, capacity: available });
            }
        }
        Ok(())
    }
}
