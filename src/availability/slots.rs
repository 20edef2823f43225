// Time-slot primitives
// Interval overlap, buffer spacing and slot generation over a single business day

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::validation::hhmm;

/// A date plus a half-open `[start, end)` window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self { date, start, end }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Strict overlap of `[a_start, a_end)` and `[b_start, b_end)`; touching endpoints do not overlap
pub fn intervals_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Conflict test phrased as the three row-filter conditions used against stored
/// bookings: the candidate starts during, ends during, or fully contains the existing one.
pub fn conflicts_with(
    start: NaiveTime,
    end: NaiveTime,
    existing_start: NaiveTime,
    existing_end: NaiveTime,
) -> bool {
    let starts_during = start >= existing_start && start < existing_end;
    let ends_during = end > existing_start && end <= existing_end;
    let contains = start <= existing_start && end >= existing_end;

    starts_during || ends_during || contains
}

/// Idle minutes between a candidate and a non-overlapping existing interval.
/// `None` when the two overlap.
pub fn gap_minutes(
    start: NaiveTime,
    end: NaiveTime,
    existing_start: NaiveTime,
    existing_end: NaiveTime,
) -> Option<i64> {
    if existing_end <= start {
        Some((start - existing_end).num_minutes())
    } else if end <= existing_start {
        Some((existing_start - end).num_minutes())
    } else {
        None
    }
}

/// True when the candidate sits closer than `buffer_minutes` to an adjacent interval
pub fn violates_buffer(
    start: NaiveTime,
    end: NaiveTime,
    existing_start: NaiveTime,
    existing_end: NaiveTime,
    buffer_minutes: u32,
) -> bool {
    match gap_minutes(start, end, existing_start, existing_end) {
        Some(gap) => gap < i64::from(buffer_minutes),
        None => false,
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_from_minutes(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// `start + minutes` on the same day; `None` past midnight
pub fn add_minutes(start: NaiveTime, minutes: u32) -> Option<NaiveTime> {
    time_from_minutes(minute_of_day(start).checked_add(minutes)?)
}

/// Consecutive slots of exactly `duration` minutes between `day_start` and `day_end`.
///
/// Each step advances by `duration + buffer_before + buffer_after`; generation stops
/// once the next slot would end after `day_end`.
pub fn generate_slots(
    date: NaiveDate,
    day_start: NaiveTime,
    day_end: NaiveTime,
    duration: u32,
    buffer_before: u32,
    buffer_after: u32,
) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    if duration == 0 {
        return slots;
    }

    let Some(step) = duration
        .checked_add(buffer_before)
        .and_then(|s| s.checked_add(buffer_after))
    else {
        return slots;
    };
    let end_of_day = minute_of_day(day_end);
    let mut cursor = minute_of_day(day_start);

    while let Some(slot_end) = cursor.checked_add(duration).filter(|end| *end <= end_of_day) {
        match (time_from_minutes(cursor), time_from_minutes(slot_end)) {
            (Some(start), Some(end)) => slots.push(TimeSlot::new(date, start, end)),
            _ => break,
        }
        match cursor.checked_add(step) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        assert!(!intervals_overlap(t(11, 0), t(12, 0), t(10, 0), t(11, 0)));
        assert!(!conflicts_with(t(11, 0), t(12, 0), t(10, 0), t(11, 0)));
        assert!(intervals_overlap(t(10, 30), t(11, 30), t(10, 0), t(11, 0)));
    }

    #[test]
    fn test_conflict_sub_conditions() {
        // starts during
        assert!(conflicts_with(t(10, 30), t(12, 0), t(10, 0), t(11, 0)));
        // ends during
        assert!(conflicts_with(t(9, 0), t(10, 30), t(10, 0), t(11, 0)));
        // contains
        assert!(conflicts_with(t(9, 0), t(12, 0), t(10, 0), t(11, 0)));
    }

    #[test]
    fn test_buffer_spacing() {
        assert_eq!(gap_minutes(t(11, 0), t(12, 0), t(10, 0), t(11, 0)), Some(0));
        assert_eq!(gap_minutes(t(8, 0), t(9, 30), t(10, 0), t(11, 0)), Some(30));
        assert_eq!(gap_minutes(t(10, 30), t(11, 30), t(10, 0), t(11, 0)), None);

        assert!(violates_buffer(t(11, 0), t(12, 0), t(10, 0), t(11, 0), 30));
        assert!(!violates_buffer(t(11, 0), t(12, 0), t(10, 0), t(11, 0), 0));
        assert!(!violates_buffer(t(11, 30), t(12, 30), t(10, 0), t(11, 0), 30));
    }

    #[test]
    fn test_generate_slots_with_extreme_values() {
        assert!(generate_slots(day(), t(8, 0), t(17, 0), u32::MAX, 0, 0).is_empty());
        assert!(generate_slots(day(), t(8, 0), t(17, 0), 60, u32::MAX, u32::MAX).is_empty());

        // The cursor cannot advance past u32::MAX, so only the first slot fits
        let slots = generate_slots(day(), t(8, 0), t(17, 0), 60, u32::MAX - 60, 0);
        assert_eq!(slots, vec![TimeSlot::new(day(), t(8, 0), t(9, 0))]);
    }

    #[test]
    fn test_generate_slots_with_buffers() {
        let slots = generate_slots(day(), t(8, 0), t(17, 0), 120, 15, 15);
        let starts: Vec<String> = slots.iter().map(|s| s.start.format("%H:%M").to_string()).collect();

        assert_eq!(starts, vec!["08:00", "10:30", "13:00"]);
        assert_eq!(slots[2].end, t(15, 0));
    }

    #[test]
    fn test_generate_slots_last_slot_ends_exactly_at_close() {
        let slots = generate_slots(day(), t(9, 0), t(13, 0), 120, 0, 0);

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].end, t(13, 0));
    }

    #[test]
    fn test_generate_slots_edge_cases() {
        assert!(generate_slots(day(), t(8, 0), t(17, 0), 0, 0, 0).is_empty());
        assert!(generate_slots(day(), t(8, 0), t(9, 0), 120, 0, 0).is_empty());
        assert!(generate_slots(day(), t(17, 0), t(8, 0), 60, 0, 0).is_empty());
    }

    #[test]
    fn test_add_minutes_does_not_wrap() {
        assert_eq!(add_minutes(t(9, 30), 150), Some(t(12, 0)));
        assert_eq!(add_minutes(t(22, 0), 120), None);
    }

    fn time_strategy() -> impl Strategy<Value = NaiveTime> {
        (0u32..24, 0u32..60).prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(
            a in time_strategy(), b in time_strategy(),
            c in time_strategy(), d in time_strategy(),
        ) {
            prop_assert_eq!(intervals_overlap(a, b, c, d), intervals_overlap(c, d, a, b));
        }

        #[test]
        fn prop_sub_conditions_match_overlap(
            s1 in 0u32..1380, len1 in 1u32..60,
            s2 in 0u32..1380, len2 in 1u32..60,
        ) {
            let (a, b) = (time_from_minutes(s1).unwrap(), time_from_minutes(s1 + len1).unwrap());
            let (c, d) = (time_from_minutes(s2).unwrap(), time_from_minutes(s2 + len2).unwrap());
            prop_assert_eq!(conflicts_with(a, b, c, d), intervals_overlap(a, b, c, d));
        }

        #[test]
        fn prop_generated_slots_stay_inside_hours(
            open in 0u32..720, length in 0u32..720,
            duration in 1u32..300, before in 0u32..60, after in 0u32..60,
        ) {
            let day_start = time_from_minutes(open).unwrap();
            let day_end = time_from_minutes(open + length).unwrap();
            let slots = generate_slots(day(), day_start, day_end, duration, before, after);

            for slot in &slots {
                prop_assert!(slot.start >= day_start);
                prop_assert!(slot.end <= day_end);
                prop_assert_eq!(slot.duration_minutes(), i64::from(duration));
            }
            for pair in slots.windows(2) {
                prop_assert_eq!(
                    (pair[1].start - pair[0].start).num_minutes(),
                    i64::from(duration + before + after)
                );
            }
        }
    }
}
