//! CSV export for the backtest ledger.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::SecondsFormat;

use crate::sim::types::LedgerRow;

/// Fixed column layout of the ledger CSV.
const HEADER: &str = "index,interval_start_local,interval_end_local,\
                      interval_start_utc,interval_end_utc,location,market,lmp,\
                      action,requested_power_mw,power_mw,energy_from_grid_mwh,\
                      energy_to_grid_mwh,throughput_mwh,soc_start,soc_end,\
                      pnl,cum_pnl";

/// Writes the ledger as CSV to a file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(ledger: &[LedgerRow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(ledger, buf)
}

/// Writes the ledger as CSV to any writer.
///
/// One row per interval in ledger order; timestamps are RFC3339 with offset
/// (empty when absent) and numeric columns carry six decimals. Output is
/// deterministic for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(ledger: &[LedgerRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    // Header
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    // Data rows
    for r in ledger {
        wtr.write_record(&[
            r.index.to_string(),
            fmt_local(&r.interval_start_local),
            fmt_local(&r.interval_end_local),
            fmt_utc(&r.interval_start_utc),
            fmt_utc(&r.interval_end_utc),
            r.location.clone(),
            r.market.clone(),
            fmt_float(r.lmp),
            r.action.as_str().to_string(),
            fmt_float(r.requested_power_mw),
            fmt_float(r.power_mw),
            fmt_float(r.energy_from_grid_mwh),
            fmt_float(r.energy_to_grid_mwh),
            fmt_float(r.throughput_mwh),
            fmt_float(r.soc_start),
            fmt_float(r.soc_end),
            fmt_float(r.pnl),
            fmt_float(r.cum_pnl),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn fmt_local(t: &chrono::DateTime<chrono::FixedOffset>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn fmt_utc(t: &Option<chrono::DateTime<chrono::Utc>>) -> String {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn fmt_float(x: f64) -> String {
    format!("{x:.6}")
}
