use crate::domain::topology::coord::Coord;
use crate::domain::utils::id::FlowId;

/// Inclusive rectangle of grid coordinates where a flow may terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandingRect {
    pub min: Coord,
    pub max: Coord,
}

impl LandingRect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        LandingRect { min: Coord::new(x1, y1), max: Coord::new(x2, y2) }
    }

    pub fn contains(&self, c: &Coord) -> bool {
        c.x >= self.min.x && c.x <= self.max.x && c.y >= self.min.y && c.y <= self.max.y
    }

    /// Manhattan distance from `c` to the closest coordinate of the rectangle. Zero inside.
    pub fn distance_from(&self, c: &Coord) -> u32 {
        let dx = if c.x < self.min.x {
            self.min.x.abs_diff(c.x)
        } else if c.x > self.max.x {
            c.x.abs_diff(self.max.x)
        } else {
            0
        };
        let dy = if c.y < self.min.y {
            self.min.y.abs_diff(c.y)
        } else if c.y > self.max.y {
            c.y.abs_diff(self.max.y)
        } else {
            0
        };
        dx + dy
    }

    pub fn is_degenerate(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }
}

/// A demand to move `demand` units of data from `access` into `landing`,
/// starting no earlier than `start_time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: FlowId,
    pub access: Coord,
    pub start_time: u32,
    pub demand: f64,
    pub landing: LandingRect,
}

impl Flow {
    pub fn new(id: FlowId, access: Coord, start_time: u32, demand: f64, landing: LandingRect) -> Self {
        Flow { id, access, start_time, demand, landing }
    }

    pub fn in_landing_range(&self, c: &Coord) -> bool {
        self.landing.contains(c)
    }

    pub fn is_active_at(&self, t: u32) -> bool {
        t >= self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_landing_rect() {
        let rect = LandingRect::new(2, 2, 3, 4);
        assert_eq!(rect.distance_from(&Coord::new(2, 3)), 0);
        assert_eq!(rect.distance_from(&Coord::new(0, 0)), 4);
        assert_eq!(rect.distance_from(&Coord::new(5, 5)), 3);
        assert_eq!(rect.distance_from(&Coord::new(3, 0)), 2);
    }

    #[test]
    fn test_degenerate_rect() {
        assert!(LandingRect::new(3, 0, 2, 0).is_degenerate());
        assert!(!LandingRect::new(2, 0, 2, 0).is_degenerate());
    }
}
