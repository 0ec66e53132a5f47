//! Streak calculation
//!
//! A streak is the run of consecutive calendar days, counted backward from
//! today, on which the habit was completed.

use chrono::NaiveDate;

/// Calculate the current streak from a set of completion dates
///
/// The dates may arrive in any order. Walking from the most recent date
/// backward, each date must be exactly `streak` days before `today`; the first
/// date that is not ends the run. A habit that was not completed today
/// therefore has a streak of 0.
pub fn calculate_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable();

    let mut streak: u32 = 0;
    for date in sorted.iter().rev() {
        let diff = (today - *date).num_days();
        if diff == i64::from(streak) {
            streak += 1;
        } else {
            break;
        }
    }

    streak
}
