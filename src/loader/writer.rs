use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::api::schedule_dto::{FlowScheduleDto, ScheduleDto, TransmissionRecordDto};
use crate::domain::scheduler::ScheduleOutcome;
use crate::domain::topology::network::Network;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// `flow <id> <count>` followed by one `t x y q` line per record.
    Text,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// `<output_dir>/<input stem>_result.<ext>`
pub fn output_path(input: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "network".to_string());
    output_dir.join(format!("{}_result.{}", stem, format.extension()))
}

/// Every flow of `network` with the records it transmitted, in flow id order.
pub fn to_schedule_dto(network: &Network, outcome: &ScheduleOutcome) -> ScheduleDto {
    let mut records = outcome.cube.records();

    let flows = network
        .flows()
        .iter()
        .map(|flow| FlowScheduleDto {
            flow_id: flow.id.into(),
            records: records
                .remove(&flow.id)
                .unwrap_or_default()
                .into_iter()
                .map(|r| TransmissionRecordDto { t: r.t, x: r.x, y: r.y, q: r.q })
                .collect(),
        })
        .collect();

    ScheduleDto {
        total_score: outcome.total_score(),
        build_status: format!("{:?}", outcome.build_status),
        optimizer_status: outcome.optimizer.as_ref().map(|r| format!("{:?}", r.status)),
        flows,
    }
}

pub fn write_text<W: Write>(dto: &ScheduleDto, mut writer: W) -> Result<()> {
    for flow in &dto.flows {
        writeln!(writer, "flow {} {}", flow.flow_id, flow.records.len())?;
        for r in &flow.records {
            writeln!(writer, "{} {} {} {:.2}", r.t, r.x, r.y, r.q)?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct CsvRow {
    flow: u32,
    t: u32,
    x: i32,
    y: i32,
    q: f64,
}

pub fn write_csv<W: Write>(dto: &ScheduleDto, writer: W) -> Result<()> {
    let mut csv_wtr = csv::WriterBuilder::new().from_writer(writer);
    for flow in &dto.flows {
        for r in &flow.records {
            csv_wtr.serialize(CsvRow { flow: flow.flow_id, t: r.t, x: r.x, y: r.y, q: r.q })?;
        }
    }
    csv_wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(dto: &ScheduleDto, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, dto)?;
    writeln!(writer)?;
    Ok(())
}

/// Writes the outcome to `path` in `format`, creating the parent directory if needed.
pub fn write_schedule(network: &Network, outcome: &ScheduleOutcome, path: &Path, format: OutputFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let dto = to_schedule_dto(network, outcome);
    let writer = BufWriter::new(File::create(path)?);
    match format {
        OutputFormat::Text => write_text(&dto, writer),
        OutputFormat::Csv => write_csv(&dto, writer),
        OutputFormat::Json => write_json(&dto, writer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto() -> ScheduleDto {
        ScheduleDto {
            total_score: 12.5,
            build_status: "Complete".to_string(),
            optimizer_status: None,
            flows: vec![
                FlowScheduleDto { flow_id: 1, records: vec![TransmissionRecordDto { t: 0, x: 2, y: 0, q: 7.5 }] },
                FlowScheduleDto { flow_id: 2, records: vec![] },
            ],
        }
    }

    #[test]
    fn test_text_format() {
        let mut out = Vec::new();
        write_text(&dto(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "flow 1 1\n0 2 0 7.50\nflow 2 0\n");
    }

    #[test]
    fn test_csv_format() {
        let mut out = Vec::new();
        write_csv(&dto(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "flow,t,x,y,q\n1,0,2,0,7.5\n");
    }

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("data/grid_a.txt"), Path::new("out"), OutputFormat::Json);
        assert_eq!(path, PathBuf::from("out/grid_a_result.json"));
    }
}
