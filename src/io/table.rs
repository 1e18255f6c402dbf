//! Climatology table text.
//!
//! ```text
//! ,[1, 1],[2, 2],...,[12, 12]
//! [6, 7],[10.1, 14.3],[9.8, 13.9],...
//! ```
//!
//! The first cell of each row is the depth bin, `[0, 0]` for an unbinned
//! table. The remaining twelve cells are `[min, max]` per calendar month.

use regex::Regex;

use crate::domain::{ClimatologyRow, ClimatologyTable, DepthBin, MonthlyRange};
use crate::error::{QcError, QcResult};

const UNBINNED: &str = "[0, 0]";

pub fn table_header() -> String {
    (1..=12).map(|m| format!(",[{m}, {m}]")).collect()
}

/// Render the table with `decimals` digits for every range bound.
pub fn format_table(table: &ClimatologyTable, decimals: usize) -> String {
    let mut out = table_header();
    out.push('\n');
    for row in &table.rows {
        match row.bin {
            Some(bin) => out.push_str(&format!("[{}, {}]", bin.lower, bin.upper)),
            None => out.push_str(UNBINNED),
        }
        for m in &row.months {
            out.push_str(&format!(",[{:.*}, {:.*}]", decimals, m.min(), decimals, m.max()));
        }
        out.push('\n');
    }
    out
}

/// Parse table text produced by [`format_table`] (or by hand).
pub fn parse_table(text: &str) -> QcResult<ClimatologyTable> {
    let cell = Regex::new(r"\[\s*([^,\]]+?)\s*,\s*([^\]]+?)\s*\]")
        .map_err(|e| QcError::invalid_input(format!("table cell pattern: {e}")))?;

    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let Some((idx, header)) = lines.next() else {
        return Err(QcError::table_format(1, "empty table"));
    };
    let months: Vec<(f64, f64)> = parse_cells(&cell, header, idx + 1)?;
    let expected: Vec<(f64, f64)> = (1..=12).map(|m| (f64::from(m), f64::from(m))).collect();
    if months != expected {
        return Err(QcError::table_format(idx + 1, "header must list months [1, 1] .. [12, 12]"));
    }

    let mut rows = Vec::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        let cells = parse_cells(&cell, line, line_no)?;
        if cells.len() != 13 {
            return Err(QcError::table_format(
                line_no,
                format!("expected 13 cells (bin + 12 months), found {}", cells.len()),
            ));
        }

        let (lower, upper) = cells[0];
        let bin = (lower != 0.0 || upper != 0.0).then_some(DepthBin::new(lower, upper));
        let months: [MonthlyRange; 12] =
            std::array::from_fn(|i| MonthlyRange::from_bounds(cells[i + 1].0, cells[i + 1].1));
        rows.push(ClimatologyRow { bin, months });
    }

    if rows.is_empty() {
        return Err(QcError::table_format(1, "table has no rows"));
    }
    Ok(ClimatologyTable {
        rows,
        skipped: Vec::new(),
    })
}

fn parse_cells(cell: &Regex, line: &str, line_no: usize) -> QcResult<Vec<(f64, f64)>> {
    cell.captures_iter(line)
        .map(|caps| {
            let lo = number(&caps[1], line_no)?;
            let hi = number(&caps[2], line_no)?;
            Ok((lo, hi))
        })
        .collect()
}

fn number(s: &str, line_no: usize) -> QcResult<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| QcError::table_format(line_no, format!("invalid number '{s}'")))
}
