//! CSV and JSON export for flow tables, summaries, and sweeps.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;
use crate::sim::kpi::SummaryMetrics;
use crate::sim::types::SimulationResult;
use crate::sweep::{SweepOutcome, SweepRun};

/// Column names for one run, units in the suffix.
fn flow_header(result: &SimulationResult) -> Vec<String> {
    let names = &result.capacities.storage_names;
    let mut header: Vec<String> = [
        "timestamp",
        "demand_gw",
        "supply_gw",
        "transmission_loss_gw",
        "net_before_dispatch_gw",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    for name in names {
        header.push(format!("{name}_charge_gw"));
        header.push(format!("{name}_discharge_gw"));
    }
    header.extend(
        [
            "electrolyser_gw",
            "hydrogen_discharge_gw",
            "dac_gw",
            "backup_gw",
            "export_gw",
            "import_gw",
            "interconnector_loss_gw",
            "curtailment_gw",
            "unmet_gw",
        ]
        .iter()
        .map(ToString::to_string),
    );
    for name in names {
        header.push(format!("{name}_level_gwh"));
    }
    header.push("hydrogen_level_gwh".to_string());
    header
}

/// Exports the per-step flow table of a run to a CSV file.
///
/// # Arguments
///
/// * `result` - Completed simulation result
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_csv(result: &SimulationResult, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_csv(result, io::BufWriter::new(file))
}

/// Writes the per-step flow table as CSV to any writer.
///
/// One row per step and one column per channel. Deterministic for identical
/// inputs.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv(result: &SimulationResult, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(flow_header(result))?;

    let n = result.storage_count();
    for ((t, f), level) in result.timestamps.iter().zip(&result.flows).zip(&result.levels) {
        let mut row = vec![
            t.format("%Y-%m-%dT%H:%M:%S").to_string(),
            format!("{:.6}", f.demand),
            format!("{:.6}", f.supply),
            format!("{:.6}", f.transmission_loss),
            format!("{:.6}", f.net_before_dispatch),
        ];
        for i in 0..n {
            row.push(format!("{:.6}", f.storage_charge[i]));
            row.push(format!("{:.6}", f.storage_discharge[i]));
        }
        for value in [
            f.electrolyser,
            f.hydrogen_discharge,
            f.dac,
            f.backup,
            f.export,
            f.import,
            f.interconnector_loss,
            f.curtailment,
            f.unmet,
        ] {
            row.push(format!("{value:.6}"));
        }
        for i in 0..n {
            row.push(format!("{:.6}", level.storage_gwh[i]));
        }
        row.push(format!("{:.6}", level.hydrogen_gwh));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes summary metrics as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialisation or writing fails.
pub fn write_summary_json(metrics: &SummaryMetrics, mut writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, metrics)?;
    writeln!(writer)?;
    Ok(())
}

/// Exports summary metrics to a JSON file.
///
/// # Errors
///
/// Returns an error if file creation, serialisation, or writing fails.
pub fn export_summary_json(metrics: &SummaryMetrics, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_summary_json(metrics, io::BufWriter::new(file))
}

const SWEEP_HEADER: [&str; 8] = [
    "renewable_capacity_gw",
    "status",
    "annual_dac_energy_gwh",
    "dac_capacity_factor",
    "annual_co2_removal_mt",
    "annual_curtailed_gwh",
    "annual_unmet_gwh",
    "unmet_steps",
];

/// Writes one row per sweep point. Metric cells are empty for points that
/// failed or never ran.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_sweep_csv(runs: &[SweepRun], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SWEEP_HEADER)?;
    for run in runs {
        let mut row = vec![
            format!("{}", run.renewable_capacity_gw),
            run.outcome.status().to_string(),
        ];
        match &run.outcome {
            SweepOutcome::Completed(m) => {
                row.push(format!("{:.6}", m.annual_dac_energy_gwh));
                row.push(format!("{:.6}", m.dac_capacity_factor));
                row.push(m.annual_co2_removal_mt.map(|v| format!("{v:.6}")).unwrap_or_default());
                row.push(format!("{:.6}", m.annual_curtailed_gwh));
                row.push(format!("{:.6}", m.annual_unmet_gwh));
                row.push(m.unmet_steps.to_string());
            }
            SweepOutcome::Failed(_) | SweepOutcome::Cancelled => {
                row.extend(std::iter::repeat_n(String::new(), SWEEP_HEADER.len() - 2));
            }
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Exports sweep results to a CSV file.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_sweep_csv(runs: &[SweepRun], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_sweep_csv(runs, io::BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::sim::types::{FlowRecord, ReservoirState, ResultCapacities};
    use chrono::{NaiveDate, TimeDelta};

    fn make_result(steps: usize) -> SimulationResult {
        let start = NaiveDate::from_ymd_opt(2050, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let flows = (0..steps)
            .map(|t| FlowRecord {
                demand: 40.0,
                supply: 42.0 + t as f64,
                net_before_dispatch: 2.0 + t as f64,
                dac: 2.0 + t as f64,
                ..FlowRecord::default()
            })
            .collect();
        let mut level = ReservoirState::default();
        level.storage_gwh[0] = 50.0;
        level.hydrogen_gwh = 10.0;
        SimulationResult {
            timestamps: (0..steps).map(|t| start + TimeDelta::days(t as i64)).collect(),
            step_hours: 24.0,
            flows,
            levels: vec![level; steps],
            initial_state: level,
            capacities: ResultCapacities {
                storage_names: vec!["battery".to_string()],
                storage_gwh: vec![100.0],
                hydrogen_gwh: 20.0,
                dac_max_power_gw: 5.0,
                dac_specific_energy_mwh_per_t: Some(1.0),
                backup_max_power_gw: 0.0,
            },
            warnings: Vec::new(),
        }
    }

    fn csv_text(result: &SimulationResult) -> String {
        let mut buf = Vec::new();
        write_csv(result, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_names_every_channel_with_units() {
        let text = csv_text(&make_result(1));
        let header = text.lines().next().unwrap_or("");
        assert_eq!(
            header,
            "timestamp,demand_gw,supply_gw,transmission_loss_gw,net_before_dispatch_gw,\
             battery_charge_gw,battery_discharge_gw,electrolyser_gw,hydrogen_discharge_gw,\
             dac_gw,backup_gw,export_gw,import_gw,interconnector_loss_gw,curtailment_gw,\
             unmet_gw,battery_level_gwh,hydrogen_level_gwh"
        );
    }

    #[test]
    fn row_count_matches_step_count() {
        let text = csv_text(&make_result(24));
        // 1 header + 24 data rows
        assert_eq!(text.lines().count(), 25);
    }

    #[test]
    fn deterministic_output() {
        let result = make_result(5);
        assert_eq!(csv_text(&result), csv_text(&result));
    }

    #[test]
    fn rows_parse_back() {
        let text = csv_text(&make_result(3));
        let mut rdr = csv::ReaderBuilder::new().from_reader(text.as_bytes());
        let width = rdr.headers().map(csv::StringRecord::len).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == width));
        assert_eq!(&rows[2][0], "2050-01-03T00:00:00");
        let dac: f64 = rows[2][9].parse().unwrap();
        assert_eq!(dac, 4.0);
    }

    #[test]
    fn summary_json_carries_metrics() {
        let metrics = SummaryMetrics::from_result(&make_result(3));
        let mut buf = Vec::new();
        write_summary_json(&metrics, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["steps"], 3);
        assert_eq!(value["total_dac_energy_gwh"], 216.0);
        assert_eq!(value["storage"][0]["name"], "battery");
    }

    #[test]
    fn sweep_rows_leave_failed_metrics_empty() {
        let metrics = SummaryMetrics::from_result(&make_result(2));
        let runs = vec![
            SweepRun {
                renewable_capacity_gw: 100.0,
                outcome: SweepOutcome::Completed(metrics),
            },
            SweepRun {
                renewable_capacity_gw: 110.0,
                outcome: SweepOutcome::Failed(SimError::InvalidInput("boom".to_string())),
            },
            SweepRun {
                renewable_capacity_gw: 120.0,
                outcome: SweepOutcome::Cancelled,
            },
        ];
        let mut buf = Vec::new();
        write_sweep_csv(&runs, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("100,completed,"));
        assert_eq!(lines[2], "110,failed,,,,,,");
        assert_eq!(lines[3], "120,cancelled,,,,,,");
    }
}
