use chrono::NaiveDateTime;

use crate::config::SchedulingRules;
use crate::errors::ValidationError;
use crate::models::Booking;

/// Canonical form of a contact email: trimmed and ASCII-lowercased. Stored on
/// the booking and used as the rate-limit key.
pub fn canonical_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Start of the lookback window. Bookings starting at or after this instant
/// count against the contact.
pub fn window_start(now: NaiveDateTime, rules: &SchedulingRules) -> NaiveDateTime {
    now - rules.rate_limit_window
}

/// One active booking per contact per rolling window. `email_bookings` are the
/// contact's bookings as loaded from the store; anything inactive or older
/// than the window is ignored here as well.
pub fn check_rate_limit(
    email_bookings: &[Booking],
    now: NaiveDateTime,
    rules: &SchedulingRules,
) -> Result<(), ValidationError> {
    let since = window_start(now, rules);
    if email_bookings
        .iter()
        .any(|b| b.is_active() && b.start >= since)
    {
        return Err(ValidationError::limit_exceeded(rules));
    }
    Ok(())
}
