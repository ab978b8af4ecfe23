use crate::domain::topology::coord::Coord;
use crate::domain::utils::id::NodeId;

/// Length of the periodic capacity cycle, in time steps.
pub const CYCLE_LENGTH: u32 = 10;

/// A relay node on the grid.
///
/// The capacity follows a fixed cycle of [`CYCLE_LENGTH`] steps shifted by the
/// node's phase: offsets 0, 1, 8 and 9 carry nothing, 2 and 7 carry half of the
/// peak and 3 to 6 the full peak.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub coord: Coord,

    /// Capacity during the full-power part of the cycle.
    pub peak_capacity: f64,

    /// Shift of this node's cycle.
    pub phase: u32,
}

impl Node {
    pub fn new(id: NodeId, coord: Coord, peak_capacity: f64, phase: u32) -> Self {
        Node { id, coord, peak_capacity, phase }
    }

    pub fn capacity_at(&self, t: u32) -> f64 {
        cycle_capacity(self.peak_capacity, self.phase, t)
    }
}

/// The periodic capacity of a node with the given peak and phase at time `t`.
pub fn cycle_capacity(peak: f64, phase: u32, t: u32) -> f64 {
    match (phase % CYCLE_LENGTH + t % CYCLE_LENGTH) % CYCLE_LENGTH {
        0 | 1 | 8 | 9 => 0.0,
        2 | 7 => peak / 2.0,
        _ => peak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_follows_offsets() {
        let expected = [0.0, 0.0, 5.0, 10.0, 10.0, 10.0, 10.0, 5.0, 0.0, 0.0];
        for (t, want) in expected.iter().enumerate() {
            assert_eq!(cycle_capacity(10.0, 0, t as u32), *want, "offset {}", t);
        }
    }

    #[test]
    fn test_phase_shifts_cycle() {
        let node = Node::new(NodeId::new(0), Coord::new(0, 0), 10.0, 3);
        assert_eq!(node.capacity_at(0), 10.0);
        assert_eq!(node.capacity_at(4), 5.0);
        assert_eq!(node.capacity_at(5), 0.0);
        assert_eq!(node.capacity_at(10), node.capacity_at(0));
    }
}
