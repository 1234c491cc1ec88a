pub mod fmt;
mod handlers;

use crate::filter::DateFilter;
use crate::table::CountTable;
use anyhow::Result;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Requests per endpoint, split by log level.
    Handlers,
}

const REGISTRY: &[(&str, ReportKind)] = &[("handlers", ReportKind::Handlers)];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("unsupported format '{other}' (expected text or json)"),
        }
    }
}

impl ReportKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        REGISTRY
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        REGISTRY.iter().map(|(n, _)| *n)
    }

    pub fn name(self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }

    /// Feeds one raw line into `table`. Returns whether it was counted.
    pub fn record(self, table: &mut CountTable, line: &str, filter: &DateFilter) -> bool {
        match self {
            ReportKind::Handlers => handlers::record(table, line, filter),
        }
    }

    pub fn process<I, S>(self, lines: I) -> CountTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filter = DateFilter::default();
        let mut table = CountTable::new();
        for line in lines {
            self.record(&mut table, line.as_ref(), &filter);
        }
        table
    }

    pub fn render(self, table: &CountTable, format: OutputFormat, color: bool) -> Result<String> {
        match (self, format) {
            (ReportKind::Handlers, OutputFormat::Text) => Ok(handlers::render_text(table, color)),
            (ReportKind::Handlers, OutputFormat::Json) => handlers::render_json(table),
        }
    }
}
