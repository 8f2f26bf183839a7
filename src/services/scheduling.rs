use chrono::{Local, NaiveDateTime, Timelike};

use crate::config::SchedulingRules;
use crate::errors::ValidationError;
use crate::models::Booking;

/// Wall-clock time in the business's zone. Requested starts arrive and are
/// stored as local times too.
pub fn business_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Whether an existing slot `[existing_start, existing_end)` collides with a
/// candidate slot `[start, end)`.
pub fn intervals_overlap(
    existing_start: NaiveDateTime,
    existing_end: NaiveDateTime,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> bool {
    // candidate starts inside existing
    (existing_start <= start && start < existing_end)
        // candidate ends inside existing
        || (existing_start < end && end <= existing_end)
        // candidate swallows existing
        || (start <= existing_start && end >= existing_end)
}

/// Checks a requested start against the lead time, business hours and the
/// active bookings passed in. Rules are applied in that order and the first
/// failure wins.
///
/// Only the start hour is held to business hours; a slot starting at 17:30
/// is accepted even though it runs past closing.
pub fn validate_slot(
    start: NaiveDateTime,
    now: NaiveDateTime,
    active: &[Booking],
    rules: &SchedulingRules,
    exclude_id: Option<&str>,
) -> Result<(), ValidationError> {
    if start < now + rules.lead_time {
        return Err(ValidationError::too_soon(rules));
    }

    let hour = start.hour();
    if hour < rules.open_hour || hour >= rules.close_hour {
        return Err(ValidationError::outside_hours(rules));
    }

    let end = start + rules.service_duration;
    let taken = active
        .iter()
        .filter(|b| b.is_active())
        .filter(|b| exclude_id != Some(b.id.as_str()))
        .any(|b| intervals_overlap(b.start, b.end, start, end));
    if taken {
        return Err(ValidationError::SlotUnavailable);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use chrono::Duration;
    use proptest::prelude::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn booking(id: &str, start: &str, status: BookingStatus) -> Booking {
        let start = dt(start);
        Booking {
            id: id.to_string(),
            user_id: None,
            product_id: 1,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "+15551110000".to_string(),
            start,
            end: start + Duration::hours(2),
            notes: None,
            status,
            payment_ref: None,
            created_at: dt("2025-06-01 08:00"),
        }
    }

    fn now() -> NaiveDateTime {
        dt("2025-06-10 09:00")
    }

    #[test]
    fn test_just_past_lead_time_is_accepted() {
        let rules = SchedulingRules::default();
        let start = dt("2025-06-11 10:00") + Duration::seconds(1);
        let now = dt("2025-06-10 10:00");
        assert!(validate_slot(start, now, &[], &rules, None).is_ok());
    }

    #[test]
    fn test_too_soon_wins_over_conflict() {
        let rules = SchedulingRules::default();
        let existing = vec![booking("b-1", "2025-06-10 14:00", BookingStatus::Confirmed)];
        let result = validate_slot(dt("2025-06-10 14:00"), now(), &existing, &rules, None);
        assert_eq!(result, Err(ValidationError::too_soon(&rules)));
    }

    #[test]
    fn test_exactly_lead_time_is_accepted() {
        let rules = SchedulingRules::default();
        let start = now() + Duration::hours(24);
        assert!(validate_slot(start, now(), &[], &rules, None).is_ok());
    }

    #[test]
    fn test_business_hours_bounds() {
        let rules = SchedulingRules::default();
        let ok = |s: &str| validate_slot(dt(s), now(), &[], &rules, None);

        assert!(ok("2025-06-12 05:00").is_ok());
        assert!(ok("2025-06-12 17:59").is_ok());
        assert_eq!(ok("2025-06-12 04:59"), Err(ValidationError::outside_hours(&rules)));
        assert_eq!(ok("2025-06-12 18:00"), Err(ValidationError::outside_hours(&rules)));
        assert_eq!(ok("2025-06-12 23:30"), Err(ValidationError::outside_hours(&rules)));
    }

    #[test]
    fn test_rules_come_from_config() {
        let rules = SchedulingRules {
            open_hour: 9,
            close_hour: 12,
            lead_time: Duration::hours(1),
            ..SchedulingRules::default()
        };
        assert!(validate_slot(dt("2025-06-10 11:00"), now(), &[], &rules, None).is_ok());
        assert!(validate_slot(dt("2025-06-10 12:00"), now(), &[], &rules, None).is_err());
    }

    #[test]
    fn test_conflict_with_existing_booking() {
        let rules = SchedulingRules::default();
        let existing = vec![booking("b-1", "2025-06-12 10:00", BookingStatus::Pending)];

        for start in ["2025-06-12 09:00", "2025-06-12 10:00", "2025-06-12 11:30"] {
            assert_eq!(
                validate_slot(dt(start), now(), &existing, &rules, None),
                Err(ValidationError::SlotUnavailable),
                "{start} should collide"
            );
        }
    }

    #[test]
    fn test_adjacent_slots_do_not_conflict() {
        let rules = SchedulingRules::default();
        let existing = vec![booking("b-1", "2025-06-12 10:00", BookingStatus::Confirmed)];

        assert!(validate_slot(dt("2025-06-12 12:00"), now(), &existing, &rules, None).is_ok());
        assert!(validate_slot(dt("2025-06-12 08:00"), now(), &existing, &rules, None).is_ok());
    }

    #[test]
    fn test_inactive_bookings_free_their_slot() {
        let rules = SchedulingRules::default();
        let existing = vec![
            booking("b-1", "2025-06-12 10:00", BookingStatus::Cancelled),
            booking("b-2", "2025-06-12 10:00", BookingStatus::Completed),
        ];
        assert!(validate_slot(dt("2025-06-12 10:00"), now(), &existing, &rules, None).is_ok());
    }

    #[test]
    fn test_excluded_booking_is_not_compared_with_itself() {
        let rules = SchedulingRules::default();
        let existing = vec![booking("b-1", "2025-06-12 10:00", BookingStatus::Confirmed)];
        assert!(
            validate_slot(dt("2025-06-12 10:30"), now(), &existing, &rules, Some("b-1")).is_ok()
        );
    }

    #[test]
    fn test_containment_is_overlap() {
        let outer_start = dt("2025-06-12 10:00");
        let outer_end = dt("2025-06-12 14:00");
        let inner_start = dt("2025-06-12 11:00");
        let inner_end = dt("2025-06-12 12:00");

        assert!(intervals_overlap(outer_start, outer_end, inner_start, inner_end));
        assert!(intervals_overlap(inner_start, inner_end, outer_start, outer_end));
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(
            a_start in 0i64..10_000,
            a_len in 1i64..500,
            b_start in 0i64..10_000,
            b_len in 1i64..500,
        ) {
            let base = dt("2025-06-12 00:00");
            let a0 = base + Duration::minutes(a_start);
            let a1 = a0 + Duration::minutes(a_len);
            let b0 = base + Duration::minutes(b_start);
            let b1 = b0 + Duration::minutes(b_len);

            let expected = a0 < b1 && b0 < a1;
            prop_assert_eq!(intervals_overlap(a0, a1, b0, b1), expected);
            prop_assert_eq!(intervals_overlap(b0, b1, a0, a1), expected);
        }

        #[test]
        fn anything_inside_lead_time_is_too_soon(offset_minutes in 0i64..(24 * 60)) {
            let rules = SchedulingRules::default();
            let start = now() + Duration::minutes(offset_minutes);
            let existing = vec![booking("b-1", "2025-06-10 10:00", BookingStatus::Confirmed)];
            prop_assert_eq!(
                validate_slot(start, now(), &existing, &rules, None),
                Err(ValidationError::too_soon(&rules))
            );
        }
    }
}
