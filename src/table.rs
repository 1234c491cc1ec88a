use crate::models::{Level, LogEvent};
use serde::Serialize;
use std::collections::BTreeMap;

/// Request counts keyed by endpoint, then by level.
///
/// Only levels that were seen at least once are stored; a missing entry reads
/// as zero. Both maps are ordered, so iteration is already in report order.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct CountTable {
    rows: BTreeMap<String, BTreeMap<Level, u64>>,
}

impl CountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, endpoint: &str, level: Level) {
        self.add(endpoint, level, 1);
    }

    fn add(&mut self, endpoint: &str, level: Level, n: u64) {
        if n == 0 {
            return;
        }
        if let Some(levels) = self.rows.get_mut(endpoint) {
            *levels.entry(level).or_default() += n;
        } else {
            self.rows
                .insert(endpoint.to_string(), BTreeMap::from([(level, n)]));
        }
    }

    pub fn record(&mut self, event: &LogEvent<'_>) {
        self.increment(event.endpoint, event.level);
    }

    /// Adds every count of `other` into `self`.
    pub fn merge_from(&mut self, other: CountTable) {
        if self.rows.is_empty() {
            self.rows = other.rows;
            return;
        }
        for (endpoint, levels) in other.rows {
            match self.rows.get_mut(&endpoint) {
                Some(mine) => {
                    for (level, n) in levels {
                        *mine.entry(level).or_default() += n;
                    }
                }
                None => {
                    self.rows.insert(endpoint, levels);
                }
            }
        }
    }

    pub fn merge(mut self, other: CountTable) -> CountTable {
        self.merge_from(other);
        self
    }

    pub fn count(&self, endpoint: &str, level: Level) -> u64 {
        self.rows
            .get(endpoint)
            .and_then(|levels| levels.get(&level))
            .copied()
            .unwrap_or(0)
    }

    pub fn level_total(&self, level: Level) -> u64 {
        self.rows
            .values()
            .filter_map(|levels| levels.get(&level))
            .sum()
    }

    pub fn total(&self) -> u64 {
        self.rows.values().flat_map(|levels| levels.values()).sum()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Endpoints in ascending order, each with its non-zero level counts.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<Level, u64>)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<'a> Extend<LogEvent<'a>> for CountTable {
    fn extend<I: IntoIterator<Item = LogEvent<'a>>>(&mut self, iter: I) {
        for event in iter {
            self.record(&event);
        }
    }
}

impl<'a> FromIterator<LogEvent<'a>> for CountTable {
    fn from_iter<I: IntoIterator<Item = LogEvent<'a>>>(iter: I) -> Self {
        let mut table = CountTable::new();
        table.extend(iter);
        table
    }
}

#[cfg(test)]
pub(crate) fn table_of(entries: &[(&str, Level, u64)]) -> CountTable {
    let mut t = CountTable::new();
    for (endpoint, level, n) in entries {
        t.add(endpoint, *level, *n);
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use Level::*;

    fn event<'a>(endpoint: &'a str, level: Level) -> LogEvent<'a> {
        LogEvent {
            timestamp: "2023-04-20 12:34:56,789",
            level,
            endpoint,
        }
    }

    fn samples() -> Vec<CountTable> {
        vec![
            CountTable::new(),
            table_of(&[("/a", Info, 2), ("/b", Error, 1)]),
            table_of(&[("/a", Info, 1), ("/b", Warning, 1)]),
            table_of(&[("/c", Critical, 7), ("/a", Debug, 3), ("/a", Info, 4)]),
        ]
    }

    #[test]
    fn increment_adds_exactly_one() {
        let mut t = CountTable::new();
        t.increment("/a", Info);
        t.increment("/a", Info);
        t.increment("/a", Error);
        assert_eq!(t.count("/a", Info), 2);
        assert_eq!(t.count("/a", Error), 1);
        assert_eq!(t.count("/a", Debug), 0);
        assert_eq!(t.count("/missing", Info), 0);
        assert_eq!(t.total(), 3);
    }

    #[test]
    fn merges_two_partials() {
        let a = table_of(&[("/a", Info, 2), ("/b", Error, 1)]);
        let b = table_of(&[("/a", Info, 1), ("/b", Warning, 1)]);
        let expected = table_of(&[("/a", Info, 3), ("/b", Error, 1), ("/b", Warning, 1)]);
        assert_eq!(a.merge(b), expected);
    }

    #[test]
    fn merge_is_commutative() {
        for a in samples() {
            for b in samples() {
                assert_eq!(a.clone().merge(b.clone()), b.clone().merge(a.clone()));
            }
        }
    }

    #[test]
    fn merge_is_associative() {
        for a in samples() {
            for b in samples() {
                for c in samples() {
                    let left = a.clone().merge(b.clone()).merge(c.clone());
                    let right = a.clone().merge(b.clone().merge(c.clone()));
                    assert_eq!(left, right);
                }
            }
        }
    }

    #[test]
    fn empty_table_is_merge_identity() {
        for a in samples() {
            assert_eq!(a.clone().merge(CountTable::new()), a);
            assert_eq!(CountTable::new().merge(a.clone()), a);
        }
    }

    #[test]
    fn partitioning_does_not_change_counts() {
        let endpoints = ["/a", "/b", "/c", "/a/b"];
        let events: Vec<LogEvent> = (0..97)
            .map(|i| event(endpoints[i % endpoints.len()], Level::ALL[(i * 7) % 5]))
            .collect();
        let whole: CountTable = events.iter().copied().collect();

        for parts in 1..=6 {
            let merged = events
                .chunks(events.len().div_ceil(parts))
                .map(|chunk| chunk.iter().copied().collect::<CountTable>())
                .fold(CountTable::new(), CountTable::merge);
            assert_eq!(merged, whole, "{parts} partitions");
        }

        let reversed: CountTable = events.iter().rev().copied().collect();
        assert_eq!(reversed, whole);
    }

    #[test]
    fn inner_maps_hold_only_positive_counts() {
        let t = samples()
            .into_iter()
            .fold(CountTable::new(), CountTable::merge);
        for (_, levels) in t.iter() {
            assert!(!levels.is_empty());
            assert!(levels.values().all(|n| *n > 0));
        }
    }

    #[test]
    fn totals_agree() {
        let t = table_of(&[("/c", Critical, 7), ("/a", Debug, 3), ("/a", Info, 4)]);
        assert_eq!(t.level_total(Info), 4);
        assert_eq!(t.level_total(Critical), 7);
        assert_eq!(t.total(), 14);
        let by_level: u64 = Level::ALL.iter().map(|l| t.level_total(*l)).sum();
        assert_eq!(by_level, t.total());
    }

    #[test]
    fn iterates_endpoints_in_ascending_order() {
        let t = table_of(&[("/b", Info, 1), ("/a/z", Info, 1), ("/a", Info, 1)]);
        let keys: Vec<&str> = t.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["/a", "/a/z", "/b"]);
    }

    #[test]
    fn serializes_as_nested_map() {
        let t = table_of(&[("/api/v1/orders", Error, 1), ("/api/v1/orders", Warning, 1)]);
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            serde_json::json!({ "/api/v1/orders": { "ERROR": 1, "WARNING": 1 } })
        );
    }
}
