use std::collections::BTreeSet;

use crate::domain::topology::capacity::CAPACITY_EPSILON;
use crate::domain::topology::coord::Coord;
use crate::domain::utils::id::FlowId;

/// One routed and scored option for a flow at one time step.
///
/// The route is a sequence of distinct, 4-connected coordinates starting at the
/// flow's access point. `quantity` never exceeds `bottleneck`, the minimum
/// capacity the route saw when it was searched.
#[derive(Debug, Clone, PartialEq)]
pub struct Ligne {
    pub flow_id: FlowId,
    pub t: u32,
    pub route: Vec<Coord>,

    /// Smallest available capacity along the route at search time.
    pub bottleneck: f64,

    /// Quantity allocated to the flow in this step.
    pub quantity: f64,

    /// `true` if the last coordinate lies in the flow's landing rectangle.
    pub landed: bool,

    pub score: f64,
}

impl Ligne {
    /// Number of hops, i.e. route length minus one.
    pub fn hops(&self) -> usize {
        self.route.len().saturating_sub(1)
    }

    pub fn end(&self) -> Option<Coord> {
        self.route.last().copied()
    }

    /// Score per unit of quantity; zero for an empty allocation.
    pub fn efficiency(&self) -> f64 {
        if self.quantity > CAPACITY_EPSILON { self.score / self.quantity } else { 0.0 }
    }

    /// The same route carrying `quantity` instead, with the score scaled proportionally
    /// so the efficiency stays unchanged.
    pub fn scaled_to(&self, quantity: f64) -> Ligne {
        let mut scaled = self.clone();
        if self.quantity > CAPACITY_EPSILON {
            scaled.score = self.score * (quantity / self.quantity);
        } else {
            scaled.score = 0.0;
        }
        scaled.quantity = quantity;
        scaled
    }

    /// `true` if consecutive coordinates are 4-neighbors and no coordinate repeats.
    pub fn is_well_formed(&self) -> bool {
        let distinct: BTreeSet<&Coord> = self.route.iter().collect();
        distinct.len() == self.route.len() && self.route.windows(2).all(|w| w[0].is_neighbor4(&w[1]))
    }
}
