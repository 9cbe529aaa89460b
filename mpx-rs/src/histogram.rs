//! Dense per-day case counts relative to a fixed epoch.

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::event::Event;

/// Zero point for all day-offset arithmetic: the first day of the 2022
/// outbreak's public line list.
pub fn default_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 4, 20).expect("valid epoch date")
}

/// Counts for every day offset in `0..=max_day_offset`, gaps held as explicit
/// zeros. Built as a pure fold over the extracted events; nothing mutates it
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyHistogram {
    epoch: NaiveDate,
    counts: Vec<u64>,
    last_seen_date: Option<NaiveDate>,
}

impl DailyHistogram {
    /// Fold events into a dense histogram.
    ///
    /// An event dated before the epoch is rejected outright: a negative
    /// offset has no slot in the dense range and clamping it would silently
    /// move cases in time.
    pub fn from_events<I>(epoch: NaiveDate, events: I) -> Result<Self>
    where
        I: IntoIterator<Item = Event>,
    {
        let mut counts: Vec<u64> = Vec::new();
        let mut last_seen_date: Option<NaiveDate> = None;
        for event in events {
            let offset = event.date.signed_duration_since(epoch).num_days();
            if offset < 0 {
                return Err(Error::PreEpochEvent {
                    date: event.date,
                    epoch,
                });
            }
            let idx = offset as usize;
            if idx >= counts.len() {
                counts.resize(idx + 1, 0);
            }
            counts[idx] += event.count;
            if last_seen_date.is_none_or(|seen| event.date > seen) {
                last_seen_date = Some(event.date);
            }
        }
        Ok(DailyHistogram {
            epoch,
            counts,
            last_seen_date,
        })
    }

    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    /// Dense counts, index = day offset. Empty when no event was kept.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// `None` when no event was kept.
    pub fn max_day_offset(&self) -> Option<i64> {
        if self.counts.is_empty() {
            None
        } else {
            Some(self.counts.len() as i64 - 1)
        }
    }

    /// Latest calendar date seen, for freshness reporting.
    pub fn last_seen_date(&self) -> Option<NaiveDate> {
        self.last_seen_date
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(date: &str, count: u64) -> Event {
        Event {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            nation: "Nigeria".to_owned(),
            count,
        }
    }

    #[test]
    fn gaps_are_explicit_zeros() {
        let epoch = default_epoch();
        let hist = DailyHistogram::from_events(
            epoch,
            vec![event("2022-04-20", 1), event("2022-04-25", 2)],
        )
        .unwrap();
        assert_eq!(hist.counts(), &[1, 0, 0, 0, 0, 2]);
        assert_eq!(hist.max_day_offset(), Some(5));
        assert_eq!(hist.total(), 3);
    }

    #[test]
    fn repeated_days_accumulate() {
        let hist = DailyHistogram::from_events(
            default_epoch(),
            vec![event("2022-04-21", 1), event("2022-04-21", 1)],
        )
        .unwrap();
        assert_eq!(hist.counts(), &[0, 2]);
    }

    #[test]
    fn pre_epoch_event_is_rejected() {
        let err =
            DailyHistogram::from_events(default_epoch(), vec![event("2022-04-19", 1)]).unwrap_err();
        assert!(matches!(err, Error::PreEpochEvent { .. }));
    }

    #[test]
    fn last_seen_date_tracks_calendar_max() {
        let hist = DailyHistogram::from_events(
            default_epoch(),
            vec![event("2022-05-10", 1), event("2022-05-02", 1)],
        )
        .unwrap();
        assert_eq!(
            hist.last_seen_date(),
            Some(NaiveDate::from_ymd_opt(2022, 5, 10).unwrap())
        );
    }

    #[test]
    fn empty_input_builds_an_empty_histogram() {
        let hist = DailyHistogram::from_events(default_epoch(), vec![]).unwrap();
        assert!(hist.counts().is_empty());
        assert_eq!(hist.max_day_offset(), None);
        assert_eq!(hist.last_seen_date(), None);
    }
}
