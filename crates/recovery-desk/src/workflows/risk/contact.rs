use chrono::{DateTime, Utc};

use super::domain::{ContactEvent, Debtor};

/// Most recent outbound or inbound contact with the debtor.
///
/// A non-empty event log is authoritative. The scalar `last_chat_at` /
/// `last_call_at` markers are only consulted when no log entries are available,
/// so a stale scalar can never shadow a fresher logged event.
pub fn last_contact_date(
    debtor: &Debtor,
    contact_log: Option<&[ContactEvent]>,
) -> Option<DateTime<Utc>> {
    match contact_log {
        Some(events) if !events.is_empty() => events.iter().map(|event| event.occurred_at).max(),
        _ => debtor.last_chat_at.max(debtor.last_call_at),
    }
}
