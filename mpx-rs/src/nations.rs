//! Nation bookkeeping: ISO3 lookup, per-nation totals, and the
//! cumulative-emergence curve.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::event::Event;

/// Country-name to ISO3 mapping loaded from a colon-delimited table
/// (`United States:USA`). Blank lines, `#` comments, and lines without a
/// colon are skipped.
#[derive(Debug, Default, Clone)]
pub struct Iso3Table {
    by_name: BTreeMap<String, String>,
}

impl Iso3Table {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut by_name = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((name, iso3)) = line.split_once(':') {
                by_name.insert(name.trim().to_owned(), iso3.trim().to_owned());
            }
        }
        Ok(Iso3Table { by_name })
    }

    pub fn iso3_for(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn name_for(&self, iso3: &str) -> Option<&str> {
        self.by_name
            .iter()
            .find(|(_, code)| code.as_str() == iso3)
            .map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Total case count per nation, name-sorted, for the `--nations` listing.
pub fn tally_nations(events: &[Event]) -> Vec<(String, u64)> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for event in events {
        *totals.entry(event.nation.as_str()).or_insert(0) += event.count;
    }
    totals
        .into_iter()
        .map(|(name, count)| (name.to_owned(), count))
        .collect()
}

/// Cumulative number of distinct nations with at least one case, per day
/// offset from the epoch up to the last event day.
///
/// Also reports the last all-zero day, which charting uses as its left edge.
pub struct EmergenceCurve {
    /// `(day_offset, cumulative_nation_count)`, dense from day 0.
    pub points: Vec<(i64, usize)>,
    /// Index of the last day with a cumulative count of zero.
    pub plot_start: usize,
}

pub fn nation_emergence(events: &[Event], epoch: NaiveDate) -> Result<EmergenceCurve> {
    let mut per_day: BTreeMap<i64, HashSet<&str>> = BTreeMap::new();
    let mut max_day = 0i64;
    for event in events {
        let offset = event.date.signed_duration_since(epoch).num_days();
        if offset < 0 {
            return Err(Error::PreEpochEvent {
                date: event.date,
                epoch,
            });
        }
        per_day.entry(offset).or_default().insert(event.nation.as_str());
        max_day = max_day.max(offset);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut points = Vec::with_capacity(max_day as usize + 1);
    let mut plot_start = 0usize;
    for day in 0..=max_day {
        if let Some(nations) = per_day.get(&day) {
            seen.extend(nations.iter().copied());
        }
        if seen.is_empty() {
            plot_start = day as usize;
        }
        points.push((day, seen.len()));
    }
    Ok(EmergenceCurve { points, plot_start })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::default_epoch;

    fn event(date: &str, nation: &str) -> Event {
        Event {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            nation: nation.to_owned(),
            count: 1,
        }
    }

    #[test]
    fn iso3_table_loads_and_resolves_both_ways() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iso3.txt");
        fs::write(
            &path,
            "# name:code\nUnited States:USA\nNigeria:NGA\n\nmalformed line\n",
        )
        .unwrap();
        let table = Iso3Table::load(&path).unwrap();
        assert_eq!(table.iso3_for("Nigeria"), Some("NGA"));
        assert_eq!(table.name_for("USA"), Some("United States"));
        assert_eq!(table.iso3_for("malformed line"), None);
    }

    #[test]
    fn tally_is_name_sorted() {
        let events = vec![
            event("2022-05-01", "Spain"),
            event("2022-05-02", "Nigeria"),
            event("2022-05-03", "Spain"),
        ];
        let tally = tally_nations(&events);
        assert_eq!(
            tally,
            vec![("Nigeria".to_owned(), 1), ("Spain".to_owned(), 2)]
        );
    }

    #[test]
    fn emergence_curve_is_cumulative_and_dense() {
        let events = vec![
            event("2022-04-22", "Nigeria"),
            event("2022-04-24", "Spain"),
            event("2022-04-24", "Nigeria"),
        ];
        let curve = nation_emergence(&events, default_epoch()).unwrap();
        let counts: Vec<usize> = curve.points.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![0, 0, 1, 1, 2]);
        // Last zero day is offset 1.
        assert_eq!(curve.plot_start, 1);
    }
}
