use std::sync::Arc;

use uav_relay_planner::domain::planner::budget::SearchStatus;
use uav_relay_planner::domain::planner::config::PlannerConfig;
use uav_relay_planner::domain::planner::cube_builder::CubeBuilder;
use uav_relay_planner::domain::planner::efficiency_table::ConfirmedTable;
use uav_relay_planner::domain::planner::observer::SilentObserver;
use uav_relay_planner::domain::topology::coord::Coord;
use uav_relay_planner::domain::topology::flow::{Flow, LandingRect};
use uav_relay_planner::domain::topology::network::Network;
use uav_relay_planner::domain::utils::id::FlowId;

fn two_flow_network() -> Network {
    let flows = vec![
        Flow::new(FlowId::new(1), Coord::new(0, 0), 0, 25.0, LandingRect::new(3, 0, 3, 1)),
        Flow::new(FlowId::new(2), Coord::new(0, 2), 2, 15.0, LandingRect::new(3, 2, 3, 2)),
    ];
    Network::with_uniform_nodes(4, 3, 8, 10.0, 3, flows).unwrap()
}

#[test]
fn test_single_step_demand_is_done_after_that_step() {
    let flow = Flow::new(FlowId::new(1), Coord::new(0, 0), 0, 8.0, LandingRect::new(2, 0, 2, 0));
    let network = Network::with_uniform_nodes(3, 3, 6, 10.0, 3, vec![flow]).unwrap();
    let config = PlannerConfig::default();

    let report = CubeBuilder::new(&network, &config, Arc::new(SilentObserver)).build();
    let table = ConfirmedTable::from_cube(&report.cube, &network);

    let first = (0..6).find(|t| table.cell(FlowId::new(1), *t).unwrap().is_transmitting()).expect("the flow transmits at some step");
    assert!((table.quantity(FlowId::new(1), first) - 8.0).abs() < 1e-9, "a single step carries the whole demand");

    for t in first..6 {
        assert_eq!(table.cell(FlowId::new(1), t).unwrap().remaining_after, 0.0, "nothing left from t={} on", t);
    }
    assert_eq!(report.status, SearchStatus::Complete);
}

#[test]
fn test_plan_respects_start_demand_and_capacity() {
    let network = two_flow_network();
    let config = PlannerConfig::default();

    let report = CubeBuilder::new(&network, &config, Arc::new(SilentObserver)).build();
    let cube = &report.cube;

    assert_eq!(cube.horizon(), network.horizon());
    assert!(cube.validate(&network).is_ok());

    for flow in network.flows() {
        assert!(cube.delivered(flow.id) <= flow.demand + 1e-9, "flow {} got more than its demand", flow.id);
        assert!(cube.delivered(flow.id) > 0.0, "flow {} was never served", flow.id);
        for t in 0..flow.start_time {
            assert!(cube.slice(t).unwrap().ligne_for(flow.id).is_none(), "flow {} transmits before its start", flow.id);
        }
    }

    let records = cube.records();
    let flow_two = &records[&FlowId::new(2)];
    assert!(flow_two.iter().all(|r| r.t >= 2 && (r.x, r.y) == (3, 2)));
}

#[test]
fn test_idle_steps_get_empty_slices() {
    // Capacity is zero at t=5,6,7 for phase 3.
    let flow = Flow::new(FlowId::new(1), Coord::new(0, 0), 0, 500.0, LandingRect::new(2, 0, 2, 0));
    let network = Network::with_uniform_nodes(3, 1, 8, 10.0, 3, vec![flow]).unwrap();
    let config = PlannerConfig::default();

    let cube = CubeBuilder::new(&network, &config, Arc::new(SilentObserver)).build().cube;

    for t in 5..8 {
        assert!(cube.slice(t).unwrap().is_empty(), "t={} has no capacity", t);
    }
    assert!(!cube.slice(0).unwrap().is_empty());
}

#[test]
fn test_wider_search_is_never_worse() {
    let network = two_flow_network();

    let mut narrow = PlannerConfig::default();
    narrow.cube_builder.max_branching = 1;
    let mut wide = PlannerConfig::default();
    wide.cube_builder.max_branching = 3;
    wide.cube_builder.max_leaves = 10_000;

    let narrow_score = CubeBuilder::new(&network, &narrow, Arc::new(SilentObserver)).build().cube.total_score();
    let wide_score = CubeBuilder::new(&network, &wide, Arc::new(SilentObserver)).build().cube.total_score();

    assert!(wide_score >= narrow_score - 1e-9, "wide {} < greedy {}", wide_score, narrow_score);
}
