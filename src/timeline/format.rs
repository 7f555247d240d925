use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::models::{parse_timestamp, Message};

/// Rendered in place of a label when the timestamp cannot be parsed.
pub const INVALID_DATE: &str = "Invalid Date";

const DIVIDER_FORMAT: &[FormatItem<'static>] =
    format_description!("[day] [month repr:long], [year]");
const MESSAGE_FORMAT: &[FormatItem<'static>] = format_description!(
    "[day]/[month]/[year repr:last_two], [hour repr:12]:[minute] [period case:lower]"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMode {
    /// `05 March, 2025`
    Divider,
    /// `05/03/25, 02:47 pm`
    Message,
}

pub fn format_timestamp(raw: &str, mode: LabelMode, offset: UtcOffset) -> String {
    match parse_timestamp(raw).and_then(|dt| dt.checked_to_offset(offset)) {
        Some(dt) => format_datetime(dt, mode),
        None => INVALID_DATE.to_string(),
    }
}

/// Label for one timeline record: system records get the long day label.
pub fn format_entry(message: &Message, offset: UtcOffset) -> String {
    let mode = if message.is_system() {
        LabelMode::Divider
    } else {
        LabelMode::Message
    };
    format_timestamp(&message.timestamp, mode, offset)
}

/// Short "how long ago" label relative to `now`. Older timestamps fall back
/// to the message label in `now`'s offset.
pub fn format_relative(raw: &str, now: OffsetDateTime) -> String {
    let Some(dt) = parse_timestamp(raw) else {
        return INVALID_DATE.to_string();
    };
    let diff = now - dt;
    if diff.is_negative() || diff < Duration::seconds(45) {
        return "just now".to_string();
    }
    if diff < Duration::minutes(90) {
        let mins = diff.whole_minutes().max(1);
        return format!("{mins}m ago");
    }
    if diff < Duration::hours(36) {
        let hours = diff.whole_hours().max(1);
        return format!("{hours}h ago");
    }
    if diff < Duration::days(10) {
        let days = diff.whole_days().max(1);
        return format!("{days}d ago");
    }
    match dt.checked_to_offset(now.offset()) {
        Some(shifted) => format_datetime(shifted, LabelMode::Message),
        None => INVALID_DATE.to_string(),
    }
}

fn format_datetime(dt: OffsetDateTime, mode: LabelMode) -> String {
    let items = match mode {
        LabelMode::Divider => DIVIDER_FORMAT,
        LabelMode::Message => MESSAGE_FORMAT,
    };
    dt.format(items).unwrap_or_else(|err| {
        tracing::warn!(?err, "formatting timestamp label");
        INVALID_DATE.to_string()
    })
}
