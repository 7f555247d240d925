//! Chronological grouping of a zone's messages.
//!
//! The backend hands us messages already ordered by send time. Before
//! rendering, a synthetic `system` record is inserted in front of the first
//! message of each calendar day, where "day" is the viewer's local day.

use time::{Date, UtcOffset};

use crate::models::{parse_timestamp, Message, SYSTEM_KIND};

pub mod format;

pub use format::{format_entry, format_relative, format_timestamp, LabelMode, INVALID_DATE};

const DIVIDER_ID_PREFIX: &str = "divider-";

/// Calendar date of `timestamp` as seen from `offset`, or `None` when the
/// timestamp is unreadable or cannot be shifted into `offset` without
/// leaving the supported year range. All such timestamps share the `None` day.
pub fn day_key(timestamp: &str, offset: UtcOffset) -> Option<Date> {
    parse_timestamp(timestamp)
        .and_then(|dt| dt.checked_to_offset(offset))
        .map(|dt| dt.date())
}

/// Returns `messages` with a day divider in front of the first message of
/// every calendar day.
///
/// Input must already be sorted by timestamp. Nothing is sorted here; an
/// unsorted sequence produces one divider per day change it walks over.
pub fn insert_day_dividers<I>(messages: I, offset: UtcOffset) -> Vec<Message>
where
    I: IntoIterator<Item = Message>,
{
    let messages = messages.into_iter();
    let mut out = Vec::with_capacity(messages.size_hint().0 * 2);
    let mut cursor: Option<Option<Date>> = None;
    let mut dividers = 0usize;

    for message in messages {
        let key = day_key(&message.timestamp, offset);
        if cursor != Some(key) {
            out.push(divider_for(key, &message.timestamp));
            cursor = Some(key);
            dividers += 1;
        }
        out.push(message);
    }

    tracing::debug!(
        dividers,
        records = out.len(),
        %offset,
        "inserted day dividers"
    );
    out
}

/// Number of day changes a sorted sequence walks over, i.e. the number of
/// dividers [`insert_day_dividers`] would emit for it.
pub fn count_days(messages: &[Message], offset: UtcOffset) -> usize {
    let mut cursor: Option<Option<Date>> = None;
    let mut days = 0;
    for message in messages {
        let key = day_key(&message.timestamp, offset);
        if cursor != Some(key) {
            cursor = Some(key);
            days += 1;
        }
    }
    days
}

pub fn divider_id(day: Option<Date>) -> String {
    match day {
        Some(date) => format!(
            "{DIVIDER_ID_PREFIX}{:04}-{:02}-{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        ),
        None => format!("{DIVIDER_ID_PREFIX}invalid-date"),
    }
}

fn divider_for(day: Option<Date>, timestamp: &str) -> Message {
    Message {
        id: divider_id(day),
        kind: SYSTEM_KIND.to_string(),
        timestamp: timestamp.to_string(),
        ..Message::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, offset};

    fn msg(id: &str, timestamp: &str) -> Message {
        Message {
            id: id.to_string(),
            author_id: "u1".to_string(),
            kind: "text".to_string(),
            content: format!("body of {id}"),
            timestamp: timestamp.to_string(),
            reply_to_id: None,
            space_id: "s1".to_string(),
            zone_id: "z1".to_string(),
        }
    }

    fn ids(records: &[Message]) -> Vec<&str> {
        records.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn empty_input_yields_nothing() {
        let out = insert_day_dividers(Vec::new(), offset!(+10));
        assert!(out.is_empty());
    }

    #[test]
    fn single_day_gets_one_leading_divider() {
        let input = vec![
            msg("a", "2025-03-05T08:00:00+10:00"),
            msg("b", "2025-03-05T12:30:00+10:00"),
            msg("c", "2025-03-05T23:59:59+10:00"),
        ];
        let out = insert_day_dividers(input, offset!(+10));
        assert_eq!(ids(&out), ["divider-2025-03-05", "a", "b", "c"]);
        assert!(out[0].is_system());
        assert_eq!(out[0].timestamp, "2025-03-05T08:00:00+10:00");
        assert!(out[0].author_id.is_empty());
        assert!(out[0].content.is_empty());
        assert!(out[0].reply_to_id.is_none());
    }

    #[test]
    fn midnight_crossing_splits_on_local_day() {
        let input = vec![
            msg("late", "2025-03-05T23:50:00+10:00"),
            msg("early", "2025-03-06T00:10:00+10:00"),
        ];
        let out = insert_day_dividers(input, offset!(+10));
        assert_eq!(
            ids(&out),
            ["divider-2025-03-05", "late", "divider-2025-03-06", "early"]
        );
    }

    #[test]
    fn local_day_is_used_rather_than_utc() {
        // Both instants fall on 2025-03-05 in UTC but straddle midnight at +10.
        let input = vec![
            msg("a", "2025-03-05T13:50:00Z"),
            msg("b", "2025-03-05T14:10:00Z"),
        ];
        let local = insert_day_dividers(input.clone(), offset!(+10));
        assert_eq!(
            ids(&local),
            ["divider-2025-03-05", "a", "divider-2025-03-06", "b"]
        );
        let utc = insert_day_dividers(input, offset!(UTC));
        assert_eq!(ids(&utc), ["divider-2025-03-05", "a", "b"]);
    }

    #[test]
    fn gaps_only_mark_the_day_of_the_next_message() {
        let input = vec![
            msg("a", "2025-03-01T10:00:00+00:00"),
            msg("b", "2025-03-09T10:00:00+00:00"),
        ];
        let out = insert_day_dividers(input, offset!(UTC));
        assert_eq!(
            ids(&out),
            ["divider-2025-03-01", "a", "divider-2025-03-09", "b"]
        );
    }

    #[test]
    fn divider_count_matches_distinct_days_and_precedes_each_day() {
        let input = vec![
            msg("a", "2025-01-31T09:00:00+00:00"),
            msg("b", "2025-01-31T18:00:00+00:00"),
            msg("c", "2025-02-01T00:00:00+00:00"),
            msg("d", "2025-02-03T07:15:00+00:00"),
            msg("e", "2025-02-03T07:16:00+00:00"),
        ];
        let expected_days = count_days(&input, offset!(UTC));
        let out = insert_day_dividers(input, offset!(UTC));
        let dividers: Vec<_> = out.iter().filter(|m| m.is_system()).collect();
        assert_eq!(expected_days, 3);
        assert_eq!(dividers.len(), 3);

        for (idx, record) in out.iter().enumerate() {
            if record.is_system() {
                let next = &out[idx + 1];
                assert!(!next.is_system());
                assert_eq!(record.timestamp, next.timestamp);
                assert_eq!(
                    record.id,
                    divider_id(day_key(&next.timestamp, offset!(UTC)))
                );
            }
        }
    }

    #[test]
    fn repeated_runs_produce_identical_divider_ids() {
        let input = vec![
            msg("a", "2025-03-05T08:00:00+10:00"),
            msg("b", "2025-03-07T08:00:00+10:00"),
        ];
        let first = insert_day_dividers(input.clone(), offset!(+10));
        let second = insert_day_dividers(input, offset!(+10));
        assert_eq!(first, second);
    }

    #[test]
    fn unsorted_input_emits_a_divider_per_day_change() {
        let input = vec![
            msg("a", "2025-03-05T08:00:00+00:00"),
            msg("b", "2025-03-06T08:00:00+00:00"),
            msg("c", "2025-03-05T09:00:00+00:00"),
        ];
        let out = insert_day_dividers(input, offset!(UTC));
        assert_eq!(out.iter().filter(|m| m.is_system()).count(), 3);
    }

    #[test]
    fn unreadable_timestamps_share_one_day() {
        let input = vec![
            msg("a", "garbage"),
            msg("b", "also garbage"),
            msg("c", "2025-03-05T08:00:00+00:00"),
        ];
        let out = insert_day_dividers(input, offset!(UTC));
        assert_eq!(
            ids(&out),
            ["divider-invalid-date", "a", "b", "divider-2025-03-05", "c"]
        );
    }

    #[test]
    fn timestamps_shifted_past_year_range_join_the_invalid_day() {
        let input = vec![
            msg("edge", "9999-12-31T23:30:00-10:00"),
            msg("bad", "garbage"),
        ];
        assert_eq!(day_key("9999-12-31T23:30:00-10:00", offset!(+10)), None);
        let out = insert_day_dividers(input, offset!(+10));
        assert_eq!(ids(&out), ["divider-invalid-date", "edge", "bad"]);
    }

    #[test]
    fn day_key_applies_offset() {
        assert_eq!(
            day_key("2025-03-05T23:30:00-05:00", offset!(UTC)),
            Some(date!(2025 - 03 - 06))
        );
        assert_eq!(
            day_key("2025-03-05T23:30:00-05:00", offset!(-5)),
            Some(date!(2025 - 03 - 05))
        );
        assert_eq!(day_key("nope", offset!(UTC)), None);
    }
}
