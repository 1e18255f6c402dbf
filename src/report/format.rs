//! Formatted terminal output.
//!
//! Formatting lives in one place so the estimators stay free of presentation
//! code and output changes stay localized.

use crate::app::pipeline::{ParameterOutcome, RunOutput};
use crate::domain::{ClimatologyTable, DepthBin, RunConfig};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Run summary: inputs, annotations and per-parameter results.
pub fn format_run_summary(run: &RunOutput, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== qartod - {} {} ===\n",
        config.designator.stem(),
        config.instrument.display_name()
    ));
    out.push_str(&format!("Stream: {}\n", config.instrument.stream()));
    out.push_str(&format!(
        "Rows: read={} used={} | window=[{}, {}]\n",
        run.rows_read,
        run.rows_used,
        run.window.0.format("%Y-%m-%d"),
        run.window.1.format("%Y-%m-%d")
    ));
    out.push_str(&format!(
        "Samples: n={}{}\n",
        run.samples,
        if run.resampled {
            format!(" ({}-minute medians)", config.resample_minutes)
        } else {
            String::new()
        }
    ));
    out.push_str(&format!(
        "Annotations: historical={} generated={} rejected={}\n",
        run.historical, run.generated, run.rejected_annotations
    ));

    out.push_str("\nParameters:\n");
    for p in &run.parameters {
        out.push_str(&format_parameter(p));
    }

    out.push_str(&format!("\nWrote {}\n", run.paths.gross_range.display()));
    out.push_str(&format!("Wrote {}\n", run.paths.climatology.display()));
    out.push_str(&format!("Wrote {}\n", run.paths.annotations.display()));
    out
}

fn format_parameter(p: &ParameterOutcome) -> String {
    let mut out = format!(
        "- {} | blocks={} excluded={} usable={}\n",
        p.name, p.blocks, p.excluded, p.usable
    );

    match &p.gross_range {
        Ok(gr) => {
            let mark = if gr.is_ordered() { "" } else { "  (user range exceeds sensor range)" };
            out.push_str(&format!(
                "    gross range: sensor=[{}, {}] user=[{:.4}, {:.4}]{mark}\n",
                gr.sensor_min, gr.sensor_max, gr.user_min, gr.user_max
            ));
        }
        Err(e) => out.push_str(&format!("    gross range: {e}\n")),
    }

    match &p.climatology {
        Ok(table) => out.push_str(&format_climatology(table)),
        Err(e) => out.push_str(&format!("    climatology: {e}\n")),
    }
    out
}

fn format_climatology(table: &ClimatologyTable) -> String {
    let mut out = String::new();
    if table.is_binned() {
        out.push_str(&format!(
            "    climatology: {} depth bins fitted, {} skipped\n",
            table.rows.len(),
            table.skipped.len()
        ));
        for s in &table.skipped {
            out.push_str(&format!("      skipped {}: {}\n", s.bin, s.reason));
        }
        return out;
    }

    out.push_str("    climatology:\n");
    for row in &table.rows {
        for (name, m) in MONTHS.iter().zip(row.months.iter()) {
            out.push_str(&format!("      {name} [{:>10.4}, {:>10.4}]\n", m.min(), m.max()));
        }
    }
    out
}

/// One bin per line, `lower upper`.
pub fn format_bins(bins: &[DepthBin]) -> String {
    let mut out = String::new();
    for b in bins {
        out.push_str(&format!("{:>7} {:>7}\n", b.lower, b.upper));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClimatologyRow, GrossRangeSpec, MonthlyRange, SkippedBin};
    use crate::error::QcError;

    fn outcome(table: ClimatologyTable) -> ParameterOutcome {
        ParameterOutcome {
            name: "seawater_ph".to_string(),
            blocks: 2,
            excluded: 10,
            usable: 900,
            gross_range: Ok(GrossRangeSpec {
                sensor_min: 6.9,
                sensor_max: 9.0,
                user_min: 7.5,
                user_max: 8.2,
            }),
            climatology: Ok(table),
        }
    }

    #[test]
    fn unbinned_climatology_lists_months() {
        let table = ClimatologyTable {
            rows: vec![ClimatologyRow {
                bin: None,
                months: [MonthlyRange::from_bounds(7.6, 8.0); 12],
            }],
            skipped: vec![],
        };
        let text = format_parameter(&outcome(table));
        assert!(text.contains("blocks=2 excluded=10 usable=900"));
        assert!(text.contains("user=[7.5000, 8.2000]"));
        assert!(text.contains("Jan [    7.6000,     8.0000]"));
        assert_eq!(text.lines().count(), 15);
    }

    #[test]
    fn binned_climatology_reports_skips() {
        let bin = DepthBin::new(150.0, 195.0);
        let table = ClimatologyTable {
            rows: vec![ClimatologyRow {
                bin: Some(DepthBin::new(15.0, 25.0)),
                months: [MonthlyRange::from_bounds(7.6, 8.0); 12],
            }],
            skipped: vec![SkippedBin {
                bin,
                reason: QcError::DepthBinOutOfRange { bin },
            }],
        };
        let text = format_parameter(&outcome(table));
        assert!(text.contains("1 depth bins fitted, 1 skipped"));
        assert!(text.contains("skipped [150,195]"));
    }

    #[test]
    fn bins_print_one_per_line() {
        let text = format_bins(&[DepthBin::new(6.0, 7.0), DepthBin::new(7.0, 8.0)]);
        assert_eq!(text, "      6       7\n      7       8\n");
    }
}
