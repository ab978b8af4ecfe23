use std::collections::BTreeMap;

use crate::domain::topology::coord::Coord;

/// Tolerance used when comparing capacities and quantities.
pub const CAPACITY_EPSILON: f64 = 1e-9;

/// Available capacity of every grid position at one time step.
///
/// Positions without a node carry zero. A snapshot is a plain value: the slice
/// planner clones it before depleting it for a branch, so sibling branches never
/// see each other's deductions.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacitySnapshot {
    width: i32,
    height: i32,
    available: Vec<f64>,
}

impl CapacitySnapshot {
    pub fn empty(width: i32, height: i32) -> Self {
        let cells = (width.max(0) as usize) * (height.max(0) as usize);
        CapacitySnapshot { width, height, available: vec![0.0; cells] }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_grid(&self, c: &Coord) -> bool {
        c.x >= 0 && c.x < self.width && c.y >= 0 && c.y < self.height
    }

    fn index(&self, c: &Coord) -> Option<usize> {
        if self.in_grid(c) { Some((c.y * self.width + c.x) as usize) } else { None }
    }

    /// Available capacity at `c`; zero outside the grid.
    pub fn get(&self, c: &Coord) -> f64 {
        self.index(c).map(|i| self.available[i]).unwrap_or(0.0)
    }

    pub fn set(&mut self, c: &Coord, value: f64) {
        if let Some(i) = self.index(c) {
            self.available[i] = value.max(0.0);
        } else {
            log::error!("Capacity write outside the {}x{} grid at {}", self.width, self.height, c);
        }
    }

    /// Removes `quantity` from every coordinate of `route`, clamping at zero.
    pub fn deduct(&mut self, route: &[Coord], quantity: f64) {
        for c in route {
            if let Some(i) = self.index(c) {
                let left = self.available[i] - quantity;
                if left < -CAPACITY_EPSILON {
                    log::error!("Deducting {} at {} leaves a negative capacity of {}. Signals an overbooked route.", quantity, c, left);
                }
                self.available[i] = left.max(0.0);
            }
        }
    }

    /// Removes per-coordinate usage, e.g. the aggregate usage of a slice, clamping at zero.
    pub fn subtract_usage(&mut self, usage: &BTreeMap<Coord, f64>) {
        for (c, quantity) in usage {
            if let Some(i) = self.index(c) {
                self.available[i] = (self.available[i] - quantity).max(0.0);
            }
        }
    }
}
