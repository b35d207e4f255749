//! Display-continuity history for indices without a recorded series.
//!
//! These values are a bounded random walk around the current reading, not
//! authoritative history. Results built here set `history_is_approximate`.

use crate::domain::indicators::{IndexHistory, YearlyRange};
use chrono::{NaiveDate, TimeDelta};
use rand::Rng;

const YESTERDAY_STEP: i16 = 3;
const WEEK_STEP: i16 = 6;
const MONTH_STEP: i16 = 12;
const YEARLY_SPREAD: i16 = 15;

fn clamp_index(value: i16) -> u8 {
    value.clamp(0, 100) as u8
}

fn walk<R: Rng>(rng: &mut R, from: u8, step: i16) -> u8 {
    clamp_index(from as i16 + rng.random_range(-step..=step))
}

/// Random-walk `historical` and `yearly` fields seeded from `value`.
pub fn approximate_history<R: Rng>(
    rng: &mut R,
    value: u8,
    today: NaiveDate,
) -> (IndexHistory, YearlyRange) {
    let yesterday = walk(rng, value, YESTERDAY_STEP);
    let last_week = walk(rng, yesterday, WEEK_STEP);
    let last_month = walk(rng, last_week, MONTH_STEP);

    let observed = [value, yesterday, last_week, last_month];
    let max_seen = observed.iter().copied().max().unwrap_or(value);
    let min_seen = observed.iter().copied().min().unwrap_or(value);

    let high = clamp_index(max_seen as i16 + rng.random_range(0..=YEARLY_SPREAD));
    let low = clamp_index(min_seen as i16 - rng.random_range(0..=YEARLY_SPREAD));

    let high_date = today - TimeDelta::days(rng.random_range(31..=364));
    let low_date = today - TimeDelta::days(rng.random_range(31..=364));

    (
        IndexHistory {
            yesterday,
            last_week,
            last_month,
        },
        YearlyRange {
            high,
            high_date,
            low,
            low_date,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_walk_stays_bounded_and_ordered() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 10).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for value in [0u8, 1, 30, 50, 99, 100] {
            for _ in 0..200 {
                let (history, yearly) = approximate_history(&mut rng, value, today);

                assert!(history.yesterday.abs_diff(value) <= YESTERDAY_STEP as u8);
                assert!(history.last_week <= 100 && history.last_month <= 100);
                assert!(yearly.high <= 100);
                assert!(yearly.low <= yearly.high);
                assert!(yearly.high >= value && yearly.low <= value);
                assert!(yearly.high_date < today && yearly.low_date < today);
            }
        }
    }
}
