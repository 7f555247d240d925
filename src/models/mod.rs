use serde::{Deserialize, Serialize};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::OffsetDateTime;

/// Kind marking records that were not written by a user (day dividers,
/// join/leave notices).
pub const SYSTEM_KIND: &str = "system";

/// A chat message as delivered by the backend for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    pub id: String,
    /// Empty for synthetic records.
    pub author_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub timestamp: String, // ISO-8601 with offset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    pub space_id: String,
    pub zone_id: String,
}

impl Message {
    pub fn is_system(&self) -> bool {
        self.kind == SYSTEM_KIND
    }

    /// `None` when the timestamp cannot be read as an offset date-time.
    pub fn parsed_timestamp(&self) -> Option<OffsetDateTime> {
        parse_timestamp(&self.timestamp)
    }
}

pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(raw, &Iso8601::DEFAULT))
        .ok()
}
