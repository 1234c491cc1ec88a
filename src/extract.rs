use crate::models::{Level, LogEvent};
use regex::Regex;
use std::sync::OnceLock;

static PATTERN: OnceLock<Regex> = OnceLock::new();

fn pattern() -> &'static Regex {
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"^(?P<ts>[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3}) ",
            r"(?P<level>DEBUG|INFO|WARNING|ERROR|CRITICAL) ",
            r"django\.request:.*?",
            r"(?P<endpoint>/\S+)",
        ))
        .expect("request line pattern is valid")
    })
}

/// Cuts a request event out of a log line, or `None` when the line isn't one.
///
/// The timestamp, level and `django.request:` marker must open the line; the
/// endpoint is the first `/`-led non-whitespace run after the marker.
pub fn extract(line: &str) -> Option<LogEvent<'_>> {
    let caps = pattern().captures(line)?;
    let level: Level = caps.name("level")?.as_str().parse().ok()?;
    Some(LogEvent {
        timestamp: caps.name("ts")?.as_str(),
        level,
        endpoint: caps.name("endpoint")?.as_str(),
    })
}
