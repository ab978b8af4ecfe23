use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse topology JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to write CSV result: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Malformed topology input at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error("Slice at t={t} overbooks node ({x},{y}): usage {usage} exceeds capacity {capacity}")]
    CapacityViolation { t: u32, x: i32, y: i32, usage: f64, capacity: f64 },

    #[error("Route of flow {flow} at t={t} is not a simple 4-connected path")]
    MalformedRoute { t: u32, flow: u32 },

    #[error("Network has an empty planning horizon")]
    EmptyHorizon,
}

pub type Result<T> = std::result::Result<T, Error>;
