//! Weekly bucketing of the daily histogram.
//!
//! Buckets are anchored at the most recent data day, not at the epoch: the
//! scan runs backward so the *last* bucket is always a full 7 days, and any
//! leftover days at the low end are dropped rather than zero-padded.

use serde::Serialize;

use crate::histogram::DailyHistogram;

/// Heuristic multiplier for the most recent bucket, compensating for
/// reporting lag. Chart-only; the fit never sees it.
pub const DEFAULT_REPORTING_LAG_FACTOR: f64 = 1.15;

/// Sum of 7 consecutive daily counts, keyed by the latest day in the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyBucket {
    /// Day offset of the last (most recent) day in the bucket.
    pub week_end_day: i64,
    pub count: u64,
}

/// Group the dense daily counts into non-overlapping 7-day sums.
///
/// `trailing_days_to_skip` excludes that many of the most recent days as
/// unreliable before bucketing begins. Buckets are returned in ascending
/// day-offset order; consecutive keys differ by exactly 7.
pub fn aggregate_weekly(hist: &DailyHistogram, trailing_days_to_skip: usize) -> Vec<WeeklyBucket> {
    let Some(max_day) = hist.max_day_offset() else {
        return Vec::new();
    };
    let top = max_day - trailing_days_to_skip as i64;
    let counts = hist.counts();

    let mut buckets = Vec::new();
    let mut sum = 0u64;
    let mut days_in_chunk = 0u32;
    let mut day = top;
    while day >= 0 {
        sum += counts[day as usize];
        days_in_chunk += 1;
        if days_in_chunk == 7 {
            // `day` is the earliest day of the chunk just completed.
            buckets.push(WeeklyBucket {
                week_end_day: day + 6,
                count: sum,
            });
            sum = 0;
            days_in_chunk = 0;
        }
        day -= 1;
    }
    // Whatever is left in `sum` is a partial low-end chunk; it is discarded.
    buckets.reverse();
    buckets
}

/// Scale only the final bucket by `factor`, returning fractional counts.
///
/// Named post-processing step for the reporting-lag heuristic; callers apply
/// it to charted values only.
pub fn apply_reporting_lag_correction(series: &[WeeklyBucket], factor: f64) -> Vec<(i64, f64)> {
    let last = series.len().checked_sub(1);
    series
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let scaled = if Some(i) == last {
                b.count as f64 * factor
            } else {
                b.count as f64
            };
            (b.week_end_day, scaled)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::histogram::default_epoch;
    use chrono::Duration;

    fn histogram_of(daily: &[u64]) -> DailyHistogram {
        let epoch = default_epoch();
        let events = daily.iter().enumerate().filter(|(_, c)| **c > 0).map(|(i, c)| Event {
            date: epoch + Duration::days(i as i64),
            nation: "World".to_owned(),
            count: *c,
        });
        DailyHistogram::from_events(epoch, events.collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn buckets_are_seven_day_sums_keyed_by_last_day() {
        // Offsets 0..=13, count 1 each day.
        let hist = histogram_of(&[1; 14]);
        let weekly = aggregate_weekly(&hist, 0);
        assert_eq!(
            weekly,
            vec![
                WeeklyBucket { week_end_day: 6, count: 7 },
                WeeklyBucket { week_end_day: 13, count: 7 },
            ]
        );
    }

    #[test]
    fn low_end_partial_week_is_dropped() {
        // Offsets 0..=19: chunks [13, 19] and [6, 12]; days 0..=5 are a
        // 6-day partial and never appear.
        let mut daily = vec![1u64; 20];
        daily[0] = 5;
        let hist = histogram_of(&daily);
        let weekly = aggregate_weekly(&hist, 0);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].week_end_day, 12);
        assert_eq!(weekly[1].week_end_day, 19);
        // Days 0..=5 (including the count of 5) never appear.
        assert_eq!(weekly.iter().map(|b| b.count).sum::<u64>(), 14);
    }

    #[test]
    fn max_day_twenty_yields_exactly_three_full_buckets() {
        // 0..=20 is 21 days: exactly three chunks, nothing dropped.
        let hist = histogram_of(&[1; 21]);
        let weekly = aggregate_weekly(&hist, 0);
        assert_eq!(weekly.len(), 3);
        assert_eq!(weekly.last().unwrap().week_end_day, 20);
    }

    #[test]
    fn trailing_skip_moves_the_anchor() {
        let hist = histogram_of(&[1; 21]);
        let weekly = aggregate_weekly(&hist, 3);
        // Anchor at day 17: chunks [11, 17] and [4, 10]; days 0..=3 dropped.
        assert_eq!(
            weekly,
            vec![
                WeeklyBucket { week_end_day: 10, count: 7 },
                WeeklyBucket { week_end_day: 17, count: 7 },
            ]
        );
    }

    #[test]
    fn buckets_ascend_in_steps_of_seven_without_overlap() {
        let daily: Vec<u64> = (0..40).map(|i| i % 5).collect();
        let hist = histogram_of(&daily);
        let weekly = aggregate_weekly(&hist, 0);
        for pair in weekly.windows(2) {
            assert_eq!(pair[1].week_end_day - pair[0].week_end_day, 7);
        }
        // Every bucket is the sum of its own 7 days.
        for b in &weekly {
            let lo = (b.week_end_day - 6) as usize;
            let hi = b.week_end_day as usize;
            let expect: u64 = hist.counts()[lo..=hi].iter().sum();
            assert_eq!(b.count, expect);
        }
    }

    #[test]
    fn lag_correction_scales_only_the_final_bucket() {
        let series = vec![
            WeeklyBucket { week_end_day: 6, count: 100 },
            WeeklyBucket { week_end_day: 13, count: 200 },
        ];
        let corrected = apply_reporting_lag_correction(&series, 1.15);
        assert_eq!(corrected[0], (6, 100.0));
        assert_eq!(corrected[1].0, 13);
        assert!((corrected[1].1 - 230.0).abs() < 1e-9);
    }

    #[test]
    fn empty_histogram_yields_empty_series() {
        let hist = DailyHistogram::from_events(default_epoch(), vec![]).unwrap();
        assert!(aggregate_weekly(&hist, 0).is_empty());
        assert!(aggregate_weekly(&hist, 3).is_empty());
    }
}
