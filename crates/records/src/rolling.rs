//! Daily, weekly and monthly player maxima with calendar-boundary resets.
//!
//! All calendar math happens at the offset carried by `now`; the previous update
//! stamp is converted into that same offset before comparing.

use crate::ServerRecord;
use rank_core::{from_minute_timestamp, minute_timestamp};
use time::{Date, OffsetDateTime};

/// Which periods started between two updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundaries {
    pub day: bool,
    pub week: bool,
    pub month: bool,
}

impl Boundaries {
    /// `previous == None` means the record was never updated; every period starts fresh.
    pub fn between(previous: Option<OffsetDateTime>, now: OffsetDateTime) -> Self {
        let Some(prev) = previous.map(|p| p.to_offset(now.offset())) else {
            return Boundaries { day: true, week: true, month: true };
        };
        let (prev_day, today) = (prev.date(), now.date());
        Boundaries {
            day: today > prev_day,
            week: week_start(today) > week_start(prev_day),
            month: (today.year(), today.month()) != (prev_day.year(), prev_day.month()),
        }
    }
}

/// Julian day of the Monday opening the week that contains `d`.
fn week_start(d: Date) -> i32 {
    d.to_julian_day() - i32::from(d.weekday().number_days_from_monday())
}

fn roll(previous: u32, current: u32, reset: bool) -> u32 {
    if reset { current } else { previous.max(current) }
}

/// Fold the server's current `numplayers` into its rolling records and stamp
/// `last_update`. Runs after every ping, online or not.
pub fn apply_rolling(server: &mut ServerRecord, now: OffsetDateTime) {
    let previous = from_minute_timestamp(server.last_update, now.offset());
    let b = Boundaries::between(previous, now);
    let n = server.numplayers;
    server.daily_record.numplayers = roll(server.daily_record.numplayers, n, b.day);
    server.weekly_record.numplayers = roll(server.weekly_record.numplayers, n, b.week);
    server.monthly_record.numplayers = roll(server.monthly_record.numplayers, n, b.month);
    server.last_update = minute_timestamp(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RollingRecord;
    use rank_core::Address;
    use time::macros::{datetime, offset};

    fn server_at(last: OffsetDateTime, best: u32, numplayers: u32) -> ServerRecord {
        let mut s = ServerRecord::new(Address::new("h", 1), None);
        s.last_update = minute_timestamp(last);
        s.daily_record = RollingRecord { numplayers: best };
        s.weekly_record = RollingRecord { numplayers: best };
        s.monthly_record = RollingRecord { numplayers: best };
        s.numplayers = numplayers;
        s
    }

    #[test]
    fn same_day_keeps_maximum() {
        let mut s = server_at(datetime!(2024-05-15 10:00 UTC), 40, 12);
        let now = datetime!(2024-05-15 10:01 UTC);
        apply_rolling(&mut s, now);
        assert_eq!(s.daily_record.numplayers, 40);
        assert_eq!(s.weekly_record.numplayers, 40);
        assert_eq!(s.monthly_record.numplayers, 40);
        assert_eq!(s.last_update, minute_timestamp(now));
    }

    #[test]
    fn new_maximum_is_taken() {
        let mut s = server_at(datetime!(2024-05-15 10:00 UTC), 40, 55);
        apply_rolling(&mut s, datetime!(2024-05-15 10:01 UTC));
        assert_eq!(s.daily_record.numplayers, 55);
        assert_eq!(s.monthly_record.numplayers, 55);
    }

    #[test]
    fn month_end_crossing_resets_day_and_month() {
        // 31st -> 1st: a raw day-of-month subtraction would miss this midnight.
        let mut s = server_at(datetime!(2024-05-31 23:59 UTC), 40, 3);
        apply_rolling(&mut s, datetime!(2024-06-01 00:00 UTC));
        assert_eq!(s.daily_record.numplayers, 3);
        assert_eq!(s.monthly_record.numplayers, 3);
        // 2024-06-01 is a Saturday, same week as Friday the 31st.
        assert_eq!(s.weekly_record.numplayers, 40);
    }

    #[test]
    fn monthly_resets_regardless_of_previous_maximum() {
        let mut s = server_at(datetime!(2024-01-20 12:00 UTC), 999, 1);
        apply_rolling(&mut s, datetime!(2024-02-02 12:00 UTC));
        assert_eq!(s.monthly_record.numplayers, 1);
    }

    #[test]
    fn same_month_next_year_still_resets() {
        let b = Boundaries::between(Some(datetime!(2023-03-10 08:00 UTC)), datetime!(2024-03-10 08:00 UTC));
        assert!(b.day && b.week && b.month);
    }

    #[test]
    fn week_resets_on_monday_and_across_full_week_gaps() {
        // Sunday -> Monday
        let b = Boundaries::between(Some(datetime!(2024-05-12 23:00 UTC)), datetime!(2024-05-13 00:30 UTC));
        assert!(b.week);
        // Monday -> Monday a week later: same weekday, still a new week.
        let b = Boundaries::between(Some(datetime!(2024-05-13 09:00 UTC)), datetime!(2024-05-20 09:00 UTC));
        assert!(b.week && b.day);
        // Monday morning -> Monday evening: no reset.
        let b = Boundaries::between(Some(datetime!(2024-05-13 09:00 UTC)), datetime!(2024-05-13 21:00 UTC));
        assert_eq!(b, Boundaries { day: false, week: false, month: false });
    }

    #[test]
    fn never_updated_starts_every_period() {
        let mut s = ServerRecord::new(Address::new("h", 1), None);
        s.numplayers = 9;
        apply_rolling(&mut s, datetime!(2024-05-15 10:00 UTC));
        assert_eq!(s.daily_record.numplayers, 9);
        assert_eq!(s.weekly_record.numplayers, 9);
        assert_eq!(s.monthly_record.numplayers, 9);
    }

    #[test]
    fn boundaries_follow_local_offset() {
        // 22:30 UTC and 23:30 UTC are the same UTC day but straddle midnight at +01:00.
        let prev = datetime!(2024-05-15 22:30 UTC);
        let now = datetime!(2024-05-15 23:30 UTC).to_offset(offset!(+1));
        assert!(Boundaries::between(Some(prev), now).day);
        assert!(!Boundaries::between(Some(prev), datetime!(2024-05-15 23:30 UTC)).day);
    }
}
