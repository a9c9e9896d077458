//! Production reports: printed insights, per-tyre CSV, and aggregates in JSON.

use std::io::Write;

use desim::{Aggregates, ProcessId, RunOutput, WorkflowProcess};
use eyre::WrapErr;
use itertools::Itertools;

use crate::PID_ATTRIBUTE;

/// Serial number assigned to the tyre produced by the given process.
#[must_use]
pub fn serial_number(process: ProcessId) -> String {
    format!("TY{:06}", usize::from(process))
}

/// Turns a stage name such as `wrap_inner_heal` into `Wrap Inner Heal`.
#[must_use]
pub fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .join(" ")
}

/// Prints overall, per-type, and per-station statistics of completed tyres.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn print_insights<W: Write>(mut out: W, output: &RunOutput) -> std::io::Result<()> {
    let aggregates = output.metrics.aggregate();
    writeln!(out, "=== SIMULATION INSIGHTS ===")?;
    let overall = if let Some(overall) = aggregates.turnaround {
        overall
    } else {
        writeln!(out, "No production data available")?;
        writeln!(out, "Incomplete tyres: {}", output.incomplete.len())?;
        return Ok(());
    };
    writeln!(out, "\nOVERALL STATISTICS:")?;
    writeln!(out, "Total tyres produced: {}", aggregates.completed)?;
    writeln!(out, "Average production time: {:.2} minutes", overall.mean)?;
    writeln!(out, "Fastest production time: {:.2} minutes", overall.min)?;
    writeln!(out, "Slowest production time: {:.2} minutes", overall.max)?;
    writeln!(out, "Total simulation time: {:.2} minutes", output.end_time)?;
    writeln!(out, "Incomplete tyres: {}", output.incomplete.len())?;

    writeln!(out, "\nPRODUCTION BY TYRE TYPE:")?;
    for kind in &aggregates.kinds {
        writeln!(out, "\n{}:", kind.kind)?;
        writeln!(out, "  Quantity produced: {}", kind.count)?;
        writeln!(out, "  Average time: {:.2} minutes", kind.turnaround.mean)?;
        writeln!(
            out,
            "  Range: {:.2} - {:.2} minutes",
            kind.turnaround.min, kind.turnaround.max
        )?;
    }

    writeln!(out, "\nSTATION STATISTICS:")?;
    for stage in &aggregates.stages {
        writeln!(out, "\n{}:", title_case(&stage.stage))?;
        writeln!(out, "  Average wait: {:.2} minutes", stage.wait.mean)?;
        writeln!(out, "  Maximum wait: {:.2} minutes", stage.wait.max)?;
        writeln!(out, "  Total wait time: {:.2} minutes", stage.wait.total)?;
        writeln!(out, "  Average queue length: {:.2}", stage.queue_length.mean)?;
    }
    Ok(())
}

/// Writes one CSV row per completed tyre: serial number, PID, start, end, total production
/// time, and the waiting time at each stage. Stages a tyre did not visit are left empty.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_production_csv<W: Write>(
    writer: W,
    completed: &[WorkflowProcess],
) -> eyre::Result<()> {
    let stages: Vec<&str> = completed
        .iter()
        .flat_map(WorkflowProcess::history)
        .map(|record| record.stage.as_str())
        .unique()
        .collect();
    let mut writer = csv::Writer::from_writer(writer);
    let header = ["serial_number", "pid", "start_time", "end_time", "total_time"]
        .iter()
        .map(|column| column.to_string())
        .chain(stages.iter().map(|stage| format!("{}_wait", stage)));
    writer.write_record(header)?;
    for tyre in completed {
        let end = tyre.completed().unwrap_or(f64::NAN);
        let mut row = vec![
            serial_number(tyre.id()),
            tyre.job().attribute(PID_ATTRIBUTE).unwrap_or_default().to_string(),
            tyre.created().to_string(),
            end.to_string(),
            (end - tyre.created()).to_string(),
        ];
        row.extend(stages.iter().map(|&stage| {
            tyre.history()
                .iter()
                .find(|record| record.stage == stage)
                .map(|record| record.wait.to_string())
                .unwrap_or_default()
        }));
        writer
            .write_record(&row)
            .wrap_err_with(|| format!("unable to write row of {}", row[0]))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the aggregates in pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_aggregates_json<W: Write>(writer: W, aggregates: &Aggregates) -> eyre::Result<()> {
    serde_json::to_writer_pretty(writer, aggregates).wrap_err("unable to write aggregates")
}
