use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::api::network_dto::NetworkDto;
use crate::domain::planner::config::PlannerConfig;
use crate::domain::topology::coord::Coord;
use crate::domain::topology::flow::{Flow, LandingRect};
use crate::domain::topology::network::Network;
use crate::domain::topology::node::Node;
use crate::domain::utils::id::{FlowId, NodeId};
use crate::error::{Error, Result};

/// Parses a JSON file into a given type `T`.
///
/// This function reads a file from `file_path`, attempts to parse it
/// as JSON, and returns an instance of `T`.
///
/// Errors are automatically converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path)?;
    let parsed_data: T = serde_json::from_str(&data)?;
    Ok(parsed_data)
}

/// Loads a network from `path`. Files ending in `.json` use the JSON format,
/// everything else the whitespace separated text format.
pub fn load_network(path: &Path) -> Result<Network> {
    let is_json = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let dto: NetworkDto = parse_json_file(&path.to_string_lossy())?;
        Network::try_from(dto)
    } else {
        let data = fs::read_to_string(path)?;
        parse_network_text(&data)
    }
}

/// Loads a planner configuration. Fields missing from the file keep their defaults.
pub fn load_config(path: &Path) -> Result<PlannerConfig> {
    parse_json_file(&path.to_string_lossy())
}

/// Whitespace separated tokens with the line they come from.
struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    last_line: usize,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        let inner = input.lines().enumerate().flat_map(|(i, line)| line.split_whitespace().map(move |token| (i + 1, token)));
        Tokens { inner: Box::new(inner), last_line: 1 }
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let Some((line, token)) = self.inner.next() else {
            return Err(Error::ParseError { line: self.last_line, message: format!("Unexpected end of input, expected {}", what) });
        };
        self.last_line = line;

        token
            .parse::<T>()
            .map_err(|_| Error::ParseError { line, message: format!("Expected {} but found '{}'", what, token) })
    }

    fn next_u32(&mut self, what: &str) -> Result<u32> {
        let value: i64 = self.next(what)?;
        u32::try_from(value).map_err(|_| Error::ParseError { line: self.last_line, message: format!("{} must be a non-negative integer, got {}", what, value) })
    }
}

/// Parses the text topology format:
///
/// ```text
/// M N FN T
/// x y B phi        (M*N node lines)
/// id x y t_start size m1 n1 m2 n2   (FN flow lines)
/// ```
///
/// `M` is the grid width, `N` its height, `T` the horizon. Nodes are numbered in
/// input order. A flow enters at `(x, y)` and lands in the rectangle `(m1, n1)-(m2, n2)`.
pub fn parse_network_text(input: &str) -> Result<Network> {
    let mut tokens = Tokens::new(input);

    let width: i32 = tokens.next("grid width M")?;
    let height: i32 = tokens.next("grid height N")?;
    let flow_count = tokens.next_u32("flow count FN")?;
    let horizon = tokens.next_u32("horizon T")?;

    if width <= 0 || height <= 0 {
        return Err(Error::InvalidTopology(format!("Grid size {}x{} must be positive", width, height)));
    }

    let node_count = (width as usize) * (height as usize);
    let mut nodes = Vec::with_capacity(node_count);
    for i in 0..node_count {
        let x: i32 = tokens.next("node x")?;
        let y: i32 = tokens.next("node y")?;
        let peak: f64 = tokens.next("node peak capacity B")?;
        let phase = tokens.next_u32("node phase phi")?;
        nodes.push(Node::new(NodeId::new(i as u32), Coord::new(x, y), peak, phase));
    }

    let mut flows = Vec::with_capacity(flow_count as usize);
    for _ in 0..flow_count {
        let id = tokens.next_u32("flow id")?;
        let x: i32 = tokens.next("flow access x")?;
        let y: i32 = tokens.next("flow access y")?;
        let start = tokens.next_u32("flow start time")?;
        let demand: f64 = tokens.next("flow size")?;
        let m1: i32 = tokens.next("landing m1")?;
        let n1: i32 = tokens.next("landing n1")?;
        let m2: i32 = tokens.next("landing m2")?;
        let n2: i32 = tokens.next("landing n2")?;
        flows.push(Flow::new(FlowId::new(id), Coord::new(x, y), start, demand, LandingRect::new(m1, n1, m2, n2)));
    }

    Network::new(width, height, horizon, nodes, flows)
}
