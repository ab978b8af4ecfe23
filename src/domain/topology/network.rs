use std::collections::{BTreeMap, BTreeSet};

use crate::api::network_dto::NetworkDto;
use crate::domain::topology::capacity::CapacitySnapshot;
use crate::domain::topology::coord::Coord;
use crate::domain::topology::flow::{Flow, LandingRect};
use crate::domain::topology::node::Node;
use crate::domain::utils::id::{FlowId, NodeId};
use crate::error::{Error, Result};

/// The grid of relay nodes together with the flows to route through it.
///
/// A `Network` is built once from validated input and only read afterwards.
/// The planner assumes every invariant checked in [`Network::new`].
#[derive(Debug, Clone)]
pub struct Network {
    /// Grid extent along `x`.
    width: i32,

    /// Grid extent along `y`.
    height: i32,

    /// Number of planned time steps, `[0, horizon)`.
    horizon: u32,

    nodes: Vec<Node>,

    /// Position of each node in `nodes`, keyed by its coordinate.
    node_index: BTreeMap<Coord, usize>,

    /// Flows ordered by id.
    flows: Vec<Flow>,
}

impl TryFrom<NetworkDto> for Network {
    type Error = Error;

    fn try_from(dto: NetworkDto) -> Result<Self> {
        let mut nodes = Vec::with_capacity(dto.nodes.len());
        for (i, node_dto) in dto.nodes.into_iter().enumerate() {
            let phase = u32::try_from(node_dto.phase)
                .map_err(|_| Error::InvalidTopology(format!("Node ({},{}) has an invalid phase {}", node_dto.x, node_dto.y, node_dto.phase)))?;
            nodes.push(Node::new(NodeId::new(i as u32), Coord::new(node_dto.x, node_dto.y), node_dto.peak_capacity, phase));
        }

        let flows = dto
            .flows
            .into_iter()
            .map(|f| {
                Flow::new(
                    FlowId::new(f.id),
                    Coord::new(f.access_x, f.access_y),
                    f.start_time,
                    f.demand,
                    LandingRect::new(f.landing.x1, f.landing.y1, f.landing.x2, f.landing.y2),
                )
            })
            .collect();

        Network::new(dto.width, dto.height, dto.horizon, nodes, flows)
    }
}

impl Network {
    /// Validates and assembles a network.
    ///
    /// Rejects negative capacities, nodes outside the grid or sharing a coordinate,
    /// non-positive demands, degenerate or out-of-grid landing rectangles, access
    /// points outside the grid, start times beyond the horizon and duplicate flow ids.
    pub fn new(width: i32, height: i32, horizon: u32, nodes: Vec<Node>, mut flows: Vec<Flow>) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidTopology(format!("Grid size {}x{} must be positive", width, height)));
        }

        let in_grid = |c: &Coord| c.x >= 0 && c.x < width && c.y >= 0 && c.y < height;

        let mut node_index = BTreeMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if !in_grid(&node.coord) {
                return Err(Error::InvalidTopology(format!("Node {} at {} lies outside the {}x{} grid", node.id, node.coord, width, height)));
            }
            if !(node.peak_capacity >= 0.0) || !node.peak_capacity.is_finite() {
                return Err(Error::InvalidTopology(format!("Node {} at {} has invalid peak capacity {}", node.id, node.coord, node.peak_capacity)));
            }
            if node_index.insert(node.coord, i).is_some() {
                return Err(Error::InvalidTopology(format!("Two nodes share the coordinate {}", node.coord)));
            }
        }

        let mut seen_flows = BTreeSet::new();
        for flow in &flows {
            if !seen_flows.insert(flow.id) {
                return Err(Error::InvalidTopology(format!("Duplicate flow id {}", flow.id)));
            }
            if !(flow.demand > 0.0) || !flow.demand.is_finite() {
                return Err(Error::InvalidTopology(format!("Flow {} has non-positive demand {}", flow.id, flow.demand)));
            }
            if !in_grid(&flow.access) {
                return Err(Error::InvalidTopology(format!("Flow {} enters the grid outside of it at {}", flow.id, flow.access)));
            }
            if flow.landing.is_degenerate() {
                return Err(Error::InvalidTopology(format!(
                    "Flow {} has a degenerate landing rectangle {}-{}",
                    flow.id, flow.landing.min, flow.landing.max
                )));
            }
            if !in_grid(&flow.landing.min) || !in_grid(&flow.landing.max) {
                return Err(Error::InvalidTopology(format!(
                    "Flow {} lands outside the grid {}-{}",
                    flow.id, flow.landing.min, flow.landing.max
                )));
            }
            if flow.start_time >= horizon {
                return Err(Error::InvalidTopology(format!("Flow {} starts at {} beyond the horizon {}", flow.id, flow.start_time, horizon)));
            }
        }

        flows.sort_by_key(|f| f.id);

        Ok(Network { width, height, horizon, nodes, node_index, flows })
    }

    /// A fully populated grid where every node has the same peak capacity and phase.
    pub fn with_uniform_nodes(width: i32, height: i32, horizon: u32, peak_capacity: f64, phase: u32, flows: Vec<Flow>) -> Result<Self> {
        let mut nodes = Vec::with_capacity((width.max(0) * height.max(0)) as usize);
        for y in 0..height {
            for x in 0..width {
                let id = NodeId::new((y * width + x) as u32);
                nodes.push(Node::new(id, Coord::new(x, y), peak_capacity, phase));
            }
        }
        Network::new(width, height, horizon, nodes, flows)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn flow(&self, id: FlowId) -> Option<&Flow> {
        self.flows.binary_search_by_key(&id, |f| f.id).ok().map(|i| &self.flows[i])
    }

    pub fn node_at(&self, c: &Coord) -> Option<&Node> {
        self.node_index.get(c).map(|i| &self.nodes[*i])
    }

    /// Capacity of the node at `c` at time `t`; zero where no node exists.
    pub fn capacity_at(&self, c: &Coord, t: u32) -> f64 {
        self.node_at(c).map(|n| n.capacity_at(t)).unwrap_or(0.0)
    }

    /// Full, undepleted capacity of every grid position at time `t`.
    pub fn capacity_snapshot(&self, t: u32) -> CapacitySnapshot {
        let mut snapshot = CapacitySnapshot::empty(self.width, self.height);
        for node in &self.nodes {
            snapshot.set(&node.coord, node.capacity_at(t));
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(id: u32, start: u32, landing: LandingRect) -> Flow {
        Flow::new(FlowId::new(id), Coord::new(0, 0), start, 10.0, landing)
    }

    #[test]
    fn test_uniform_network_snapshot() {
        let network = Network::with_uniform_nodes(3, 2, 10, 8.0, 3, vec![flow(1, 0, LandingRect::new(2, 1, 2, 1))]).unwrap();
        let snap = network.capacity_snapshot(0);

        let quiet = network.capacity_snapshot(5);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(snap.get(&Coord::new(x, y)), 8.0);
                assert_eq!(quiet.get(&Coord::new(x, y)), 0.0, "phase 3 is idle at t=5");
            }
        }
    }

    #[test]
    fn test_flows_sorted_and_found_by_id() {
        let rect = LandingRect::new(1, 1, 1, 1);
        let network = Network::with_uniform_nodes(2, 2, 5, 1.0, 0, vec![flow(7, 0, rect), flow(2, 1, rect)]).unwrap();

        let ids: Vec<u32> = network.flows().iter().map(|f| f.id.id).collect();
        assert_eq!(ids, vec![2, 7]);
        assert_eq!(network.flow(FlowId::new(7)).map(|f| f.start_time), Some(0));
        assert!(network.flow(FlowId::new(3)).is_none());
    }

    #[test]
    fn test_rejects_malformed_input() {
        let rect = LandingRect::new(1, 1, 1, 1);

        let late = Network::with_uniform_nodes(2, 2, 5, 1.0, 0, vec![flow(1, 5, rect)]);
        assert!(matches!(late, Err(Error::InvalidTopology(_))), "start time at the horizon must be rejected");

        let degenerate = Network::with_uniform_nodes(2, 2, 5, 1.0, 0, vec![flow(1, 0, LandingRect::new(1, 1, 0, 1))]);
        assert!(matches!(degenerate, Err(Error::InvalidTopology(_))));

        let duplicate = Network::with_uniform_nodes(2, 2, 5, 1.0, 0, vec![flow(1, 0, rect), flow(1, 1, rect)]);
        assert!(matches!(duplicate, Err(Error::InvalidTopology(_))));

        let negative = Network::with_uniform_nodes(2, 2, 5, -1.0, 0, vec![]);
        assert!(matches!(negative, Err(Error::InvalidTopology(_))));
    }
}
