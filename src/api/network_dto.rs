use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDto {
    pub width: i32,
    pub height: i32,
    pub horizon: u32,
    pub nodes: Vec<NodeDto>,
    pub flows: Vec<FlowDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDto {
    pub x: i32,
    pub y: i32,
    pub peak_capacity: f64,
    pub phase: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDto {
    pub id: u32,
    pub access_x: i32,
    pub access_y: i32,
    pub start_time: u32,
    pub demand: f64,
    pub landing: LandingRectDto,
}

#[derive(Debug, Deserialize)]
pub struct LandingRectDto {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}
