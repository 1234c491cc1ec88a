use super::fmt::{paint, BOLD, DIM};
use crate::extract::extract;
use crate::filter::DateFilter;
use crate::models::Level;
use crate::table::CountTable;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;

const MIN_HANDLER_WIDTH: usize = 24;
const LEVEL_WIDTH: usize = 9;

pub(super) fn record(table: &mut CountTable, line: &str, filter: &DateFilter) -> bool {
    match extract(line) {
        Some(event) if filter.matches_date(event.date()) => {
            table.record(&event);
            true
        }
        _ => false,
    }
}

pub(super) fn render_text(table: &CountTable, color: bool) -> String {
    let width = table
        .iter()
        .map(|(endpoint, _)| endpoint.chars().count() + 2)
        .max()
        .unwrap_or(0)
        .max(MIN_HANDLER_WIDTH);
    let rule = "-".repeat(width + LEVEL_WIDTH * Level::ALL.len() - 1);

    let mut header = format!("{:<width$}", "HANDLER");
    for level in Level::ALL {
        header.push_str(&format!("{:<LEVEL_WIDTH$}", level.as_str()));
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", paint(header.trim_end(), BOLD, color));
    let _ = writeln!(out, "{}", paint(&rule, DIM, color));

    for (endpoint, levels) in table.iter() {
        let mut row = format!("{endpoint:<width$}");
        for level in Level::ALL {
            let n = levels.get(&level).copied().unwrap_or(0);
            let digits = n.to_string();
            if n == 0 {
                row.push_str(&paint(&digits, DIM, color));
            } else {
                row.push_str(&digits);
            }
            row.push_str(&" ".repeat(LEVEL_WIDTH.saturating_sub(digits.len()).max(1)));
        }
        let _ = writeln!(out, "{}", row.trim_end());
    }

    let _ = writeln!(out, "{}", paint(&rule, DIM, color));
    let _ = writeln!(
        out,
        "{}",
        paint(&format!("Total requests: {}", table.total()), BOLD, color)
    );
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    report: &'static str,
    handlers: &'a CountTable,
    total: u64,
}

pub(super) fn render_json(table: &CountTable) -> Result<String> {
    let report = JsonReport {
        report: "handlers",
        handlers: table,
        total: table.total(),
    };
    serde_json::to_string_pretty(&report).context("serializing handlers report")
}
