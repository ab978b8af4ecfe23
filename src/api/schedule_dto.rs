use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDto {
    pub total_score: f64,
    pub build_status: String,
    pub optimizer_status: Option<String>,
    pub flows: Vec<FlowScheduleDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowScheduleDto {
    pub flow_id: u32,
    pub records: Vec<TransmissionRecordDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransmissionRecordDto {
    pub t: u32,
    pub x: i32,
    pub y: i32,
    pub q: f64,
}
