use chrono::{DateTime, Duration, Utc};

use super::super::domain::GradeRule;

/// Anti-spam check against the matched rule's cooldown.
///
/// A debtor that was never contacted is always contactable.
pub fn is_blocked(
    rule: &GradeRule,
    last_contact: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match last_contact {
        Some(last_contact) => now.signed_duration_since(last_contact) < cooldown(rule),
        None => false,
    }
}

/// Instant at which the gate re-opens, or `None` when contact is allowed now.
///
/// Cooldowns reaching past the calendar saturate at [`DateTime::<Utc>::MAX_UTC`].
pub fn blocked_until(
    rule: &GradeRule,
    last_contact: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !is_blocked(rule, last_contact, now) {
        return None;
    }
    let last_contact = last_contact?;
    Some(
        last_contact
            .checked_add_signed(cooldown(rule))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    )
}

fn cooldown(rule: &GradeRule) -> Duration {
    Duration::try_hours(rule.cooldown_hours()).unwrap_or(Duration::MAX)
}
