use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use uav_relay_planner::api::network_dto::NetworkDto;
use uav_relay_planner::domain::planner::config::PlannerConfig;
use uav_relay_planner::domain::planner::observer::SilentObserver;
use uav_relay_planner::domain::scheduler::Scheduler;
use uav_relay_planner::domain::topology::coord::Coord;
use uav_relay_planner::domain::utils::id::FlowId;
use uav_relay_planner::error::Error;
use uav_relay_planner::loader::parser::{load_network, parse_network_text};
use uav_relay_planner::loader::writer::{OutputFormat, output_path, to_schedule_dto, write_schedule};
use uav_relay_planner::plan_from_file;

const TEXT_NETWORK: &str = "\
3 3 1 6
0 0 10 3
1 0 10 3
2 0 10 3
0 1 10 3
1 1 10 3
2 1 10 3
0 2 10 3
1 2 10 3
2 2 10 3
1 0 0 0 30 2 0 2 0
";

const JSON_NETWORK: &str = r#"{
    "width": 2,
    "height": 1,
    "horizon": 4,
    "nodes": [
        { "x": 0, "y": 0, "peakCapacity": 8.0, "phase": 3 },
        { "x": 1, "y": 0, "peakCapacity": 8.0, "phase": 3 }
    ],
    "flows": [
        { "id": 4, "accessX": 0, "accessY": 0, "startTime": 1, "demand": 12.0, "landing": { "x1": 1, "y1": 0, "x2": 1, "y2": 0 } }
    ]
}"#;

/// A fresh directory under the system temp dir for one test.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("uav_relay_planner_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_json_network_conversion() {
    let dto: NetworkDto = serde_json::from_str(JSON_NETWORK).unwrap();
    let network = uav_relay_planner::domain::topology::network::Network::try_from(dto).unwrap();

    assert_eq!(network.width(), 2);
    assert_eq!(network.nodes().len(), 2);
    let flow = network.flow(FlowId::new(4)).unwrap();
    assert_eq!(flow.start_time, 1);
    assert_eq!(network.capacity_at(&Coord::new(1, 0), 0), 8.0);
}

#[test]
fn test_invalid_topologies_rejected() {
    let negative = TEXT_NETWORK.replacen("0 0 10 3", "0 0 -10 3", 1);
    assert!(matches!(parse_network_text(&negative), Err(Error::InvalidTopology(_))), "negative capacity");

    let degenerate = TEXT_NETWORK.replace("1 0 0 0 30 2 0 2 0", "1 0 0 0 30 2 1 2 0");
    assert!(matches!(parse_network_text(&degenerate), Err(Error::InvalidTopology(_))), "degenerate landing rectangle");

    let late = TEXT_NETWORK.replace("1 0 0 0 30 2 0 2 0", "1 0 0 6 30 2 0 2 0");
    assert!(matches!(parse_network_text(&late), Err(Error::InvalidTopology(_))), "start at the horizon");

    let outside = TEXT_NETWORK.replace("1 0 0 0 30 2 0 2 0", "1 0 0 0 30 3 0 3 0");
    assert!(matches!(parse_network_text(&outside), Err(Error::InvalidTopology(_))), "landing outside the grid");

    let empty_demand = TEXT_NETWORK.replace("1 0 0 0 30 2 0 2 0", "1 0 0 0 0 2 0 2 0");
    assert!(matches!(parse_network_text(&empty_demand), Err(Error::InvalidTopology(_))), "zero demand");

    let duplicate = TEXT_NETWORK.replace("0 2 10 3", "0 1 10 3");
    assert!(matches!(parse_network_text(&duplicate), Err(Error::InvalidTopology(_))), "two nodes on one coordinate");
}

#[test]
fn test_load_and_plan_both_formats() {
    let dir = scratch_dir("formats");
    let text_path = dir.join("grid.txt");
    let json_path = dir.join("line.json");
    fs::write(&text_path, TEXT_NETWORK).unwrap();
    fs::write(&json_path, JSON_NETWORK).unwrap();

    assert_eq!(load_network(&text_path).unwrap().flows().len(), 1);
    assert_eq!(load_network(&json_path).unwrap().horizon(), 4);
    assert!(matches!(load_network(&dir.join("missing.txt")), Err(Error::IoError(_))));

    let (network, outcome) = plan_from_file(&text_path, PlannerConfig::default(), Arc::new(SilentObserver)).unwrap();
    assert!(outcome.total_score() > 0.0);

    let dto = to_schedule_dto(&network, &outcome);
    assert_eq!(dto.flows.len(), 1);
    assert_eq!(dto.flows[0].flow_id, 1);
    let sent: f64 = dto.flows[0].records.iter().map(|r| r.q).sum();
    assert!((sent - 30.0).abs() < 1e-6, "capacity 10 over five usable steps covers the demand, sent {}", sent);
    assert!(dto.flows[0].records.iter().all(|r| (r.x, r.y) == (2, 0)));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_result_files_written() {
    let dir = scratch_dir("writer");
    let input = dir.join("grid.txt");
    fs::write(&input, TEXT_NETWORK).unwrap();

    let network = load_network(&input).unwrap();
    let outcome = Scheduler::new(network.clone(), PlannerConfig::default(), Arc::new(SilentObserver)).run().unwrap();

    for format in [OutputFormat::Text, OutputFormat::Csv, OutputFormat::Json] {
        let target = output_path(&input, &dir.join("out"), format);
        write_schedule(&network, &outcome, &target, format).unwrap();

        let written = fs::read_to_string(&target).unwrap();
        match format {
            OutputFormat::Text => assert!(written.starts_with("flow 1 ")),
            OutputFormat::Csv => assert!(written.starts_with("flow,t,x,y,q\n1,")),
            OutputFormat::Json => assert!(written.contains("\"totalScore\"")),
        }
    }

    assert!(dir.join("out/grid_result.txt").exists());
    let _ = fs::remove_dir_all(&dir);
}
