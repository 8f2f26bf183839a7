use std::sync::Arc;

use crate::models::{Booking, Product};
use crate::services::calendar::describe_slot;
use crate::services::messaging::MessagingProvider;
use crate::state::AppState;

pub fn confirmation_text(booking: &Booking, product: &Product, base_url: &str) -> String {
    let mut text = format!(
        "Hi {}, your {} is confirmed for {} (about {} hours, ${}).",
        booking.name,
        product.name,
        describe_slot(booking),
        (booking.end - booking.start).num_hours(),
        product.price,
    );
    if let Some(notes) = booking.notes.as_deref().filter(|n| !n.is_empty()) {
        text.push_str(&format!(" Notes: {notes}."));
    }
    text.push_str(&format!(
        " Add it to your calendar: {base_url}/calendar/{}.ics. Need to reschedule? Contact us at least 24 hours ahead.",
        booking.id
    ));
    text
}

pub fn operator_text(booking: &Booking, product: &Product) -> String {
    let mut text = format!(
        "New booking: {} on {}. {} / {} / {}. ${}, payment {}.",
        product.name,
        describe_slot(booking),
        booking.name,
        booking.email,
        booking.phone,
        product.price,
        booking.payment_ref.as_deref().unwrap_or("pending"),
    );
    if let Some(notes) = booking.notes.as_deref().filter(|n| !n.is_empty()) {
        text.push_str(&format!(" Notes: {notes}"));
    }
    text
}

pub async fn notify_booking_confirmed(
    messaging: &dyn MessagingProvider,
    booking: &Booking,
    product: &Product,
    base_url: &str,
) -> anyhow::Result<()> {
    messaging
        .send_message(&booking.phone, &confirmation_text(booking, product, base_url))
        .await
}

pub async fn notify_operator_of_booking(
    messaging: &dyn MessagingProvider,
    booking: &Booking,
    product: &Product,
    owner_phone: &str,
) -> anyhow::Result<()> {
    messaging
        .send_message(owner_phone, &operator_text(booking, product))
        .await
}

/// Sends both notices in the background. Delivery failures are logged and
/// never touch the booking.
pub fn spawn_confirmation_notices(state: &Arc<AppState>, booking: Booking, product: Product) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        let messaging = state.messaging.as_ref();

        if let Err(e) =
            notify_booking_confirmed(messaging, &booking, &product, &state.config.base_url).await
        {
            tracing::warn!(booking_id = %booking.id, error = %e, "failed to notify customer");
        }

        if state.config.owner_phone.is_empty() {
            tracing::debug!(booking_id = %booking.id, "no operator phone configured");
            return;
        }
        if let Err(e) =
            notify_operator_of_booking(messaging, &booking, &product, &state.config.owner_phone)
                .await
        {
            tracing::warn!(booking_id = %booking.id, error = %e, "failed to notify operator");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, ProductStatus};
    use chrono::NaiveDateTime;
    use rust_decimal::Decimal;

    fn fixtures() -> (Booking, Product) {
        let ts = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        let booking = Booking {
            id: "b-1".to_string(),
            user_id: None,
            product_id: 1,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "+15551110000".to_string(),
            start: ts("2025-06-15 14:00"),
            end: ts("2025-06-15 16:00"),
            notes: Some("Gate code 1234".to_string()),
            status: BookingStatus::Confirmed,
            payment_ref: Some("pi_123".to_string()),
            created_at: ts("2025-06-10 09:00"),
        };
        let product = Product {
            id: 1,
            name: "Premium Mobile Detail".to_string(),
            description: None,
            price: Decimal::new(7500, 2),
            status: ProductStatus::Active,
            is_membership: false,
            stripe_price_id: None,
            created_at: ts("2025-01-01 00:00"),
        };
        (booking, product)
    }

    #[test]
    fn test_confirmation_text() {
        let (booking, product) = fixtures();
        let text = confirmation_text(&booking, &product, "https://detail.example");
        assert!(text.starts_with("Hi Alice, your Premium Mobile Detail is confirmed for June 15, 2025 at 02:00 PM"));
        assert!(text.contains("about 2 hours, $75.00"));
        assert!(text.contains("Notes: Gate code 1234."));
        assert!(text.contains("https://detail.example/calendar/b-1.ics"));
    }

    #[test]
    fn test_operator_text() {
        let (mut booking, product) = fixtures();
        assert!(operator_text(&booking, &product).contains("payment pi_123"));
        booking.payment_ref = None;
        booking.notes = None;
        let text = operator_text(&booking, &product);
        assert!(text.contains("Alice / alice@example.com / +15551110000"));
        assert!(text.ends_with("payment pending."));
    }
}
