use anyhow::{bail, Context, Result};
use chrono::{Days, Local, Months, NaiveDate};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive bounds on event dates. Unset bounds pass everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl DateFilter {
    /// Resolves `--since`/`--until` expressions against the local date.
    pub fn from_exprs(since: Option<&str>, until: Option<&str>) -> Result<Self> {
        let today = Local::now().date_naive();
        let resolve = |flag: &str, expr: Option<&str>| {
            expr.map(|e| resolve_date(e, today).with_context(|| format!("invalid {flag}")))
                .transpose()
        };
        let filter = Self {
            since: resolve("--since", since)?,
            until: resolve("--until", until)?,
        };
        if let (Some(since), Some(until)) = (filter.since, filter.until) {
            if since > until {
                bail!("--since {since} is after --until {until}");
            }
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        !self.since.is_some_and(|since| date < since)
            && !self.until.is_some_and(|until| date > until)
    }

    /// Checks the `YYYY-MM-DD` date of an event. A date the calendar rejects
    /// (`2023-02-30`) only passes an empty filter.
    pub fn matches_date(&self, date: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        NaiveDate::parse_from_str(date, DATE_FORMAT).is_ok_and(|d| self.matches(d))
    }
}

/// `today`, `yesterday`, `<n>d`, `<n>w`, `<n>m` (counted back from `today`) or
/// a literal `YYYY-MM-DD`.
pub fn resolve_date(expr: &str, today: NaiveDate) -> Result<NaiveDate> {
    let expr = expr.trim();
    let resolved = match expr {
        "today" => Some(today),
        "yesterday" => today.checked_sub_days(Days::new(1)),
        _ if is_iso_date(expr) => {
            return NaiveDate::parse_from_str(expr, DATE_FORMAT)
                .with_context(|| format!("'{expr}' is not a calendar date"));
        }
        _ => {
            let Some((n, unit)) = split_offset(expr) else {
                bail!("'{expr}' is not a date (expected YYYY-MM-DD, today, yesterday, Nd, Nw or Nm)");
            };
            match unit {
                'd' => today.checked_sub_days(Days::new(n.into())),
                'w' => today.checked_sub_days(Days::new(u64::from(n) * 7)),
                _ => today.checked_sub_months(Months::new(n)),
            }
        }
    };
    resolved.with_context(|| format!("'{expr}' is out of range"))
}

fn is_iso_date(s: &str) -> bool {
    s.len() == 10
        && s.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        })
}

fn split_offset(expr: &str) -> Option<(u32, char)> {
    let unit = expr.chars().last().filter(|c| matches!(c, 'd' | 'w' | 'm'))?;
    let n = expr.strip_suffix(unit)?;
    if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((n.parse().ok()?, unit))
}
