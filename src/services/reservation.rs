use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::TransactionBehavior;

use crate::db::queries;
use crate::errors::{AppError, ValidationError};
use crate::models::{Booking, BookingStatus, Product};
use crate::services::notifications::spawn_confirmation_notices;
use crate::services::payment::{CheckoutItem, CheckoutSession};
use crate::services::rate_limit::{self, canonical_email};
use crate::services::scheduling::{self, business_now};
use crate::state::AppState;

/// Recorded as the payment reference when the processor returns none.
pub const PAYMENT_REF_SENTINEL: &str = "completed";

#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub product_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub start: NaiveDateTime,
    pub notes: Option<String>,
    pub user_id: Option<i64>,
}

impl ReservationRequest {
    fn check_fields(&self) -> Result<(), ValidationError> {
        let invalid = |field: &'static str, message: &str| {
            Err(ValidationError::InvalidField {
                field,
                message: message.to_string(),
            })
        };

        let name_len = self.name.trim().chars().count();
        if !(2..=100).contains(&name_len) {
            return invalid("name", "must be between 2 and 100 characters");
        }

        let email = self.email.trim();
        let well_formed = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.contains('@')
            }
            None => false,
        };
        if !well_formed || email.len() > 120 {
            return invalid("email", "must be a valid email address");
        }

        let phone_len = self.phone.trim().chars().count();
        if !(10..=20).contains(&phone_len) {
            return invalid("phone", "must be between 10 and 20 characters");
        }

        if self.notes.as_deref().is_some_and(|n| n.chars().count() > 500) {
            return invalid("notes", "must be at most 500 characters");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Reservation {
    pub booking: Booking,
    pub redirect_url: String,
}

/// Validates a booking request, stores it as pending and opens a checkout
/// for it. The booking is removed again if the checkout cannot be opened.
pub async fn reserve(
    state: &Arc<AppState>,
    request: ReservationRequest,
    now: NaiveDateTime,
) -> Result<Reservation, AppError> {
    request.check_fields()?;
    let rules = &state.config.rules;
    let email = canonical_email(&request.email);

    // Validation and insert share one IMMEDIATE transaction, so a concurrent
    // request cannot pass validation against the same state.
    let (booking, product) = {
        let mut db = state.db()?;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let product = queries::get_product(&tx, request.product_id)?
            .filter(Product::is_bookable)
            .ok_or(ValidationError::InvalidProduct)?;

        let end = request.start + rules.service_duration;
        let nearby = queries::get_active_bookings_in_range(
            &tx,
            &(request.start - rules.service_duration),
            &(end + rules.service_duration),
        )?;
        scheduling::validate_slot(request.start, now, &nearby, rules, None)?;

        let history = queries::get_active_bookings_for_email(
            &tx,
            &email,
            &rate_limit::window_start(now, rules),
        )?;
        rate_limit::check_rate_limit(&history, now, rules)?;

        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: request.user_id,
            product_id: product.id,
            name: request.name.trim().to_string(),
            email,
            phone: request.phone.trim().to_string(),
            start: request.start,
            end,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            status: BookingStatus::Pending,
            payment_ref: None,
            created_at: now,
        };
        queries::create_booking(&tx, &booking)?;
        tx.commit()?;
        (booking, product)
    };

    tracing::info!(
        booking_id = %booking.id,
        product_id = product.id,
        start = %booking.start,
        "pending booking created"
    );

    let session = match open_checkout(state, &product, &booking).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(booking_id = %booking.id, error = %e, "checkout creation failed, releasing slot");
            release_slot(state, &booking.id);
            return Err(AppError::PaymentUnavailable);
        }
    };

    let recorded = state.db().and_then(|db| {
        queries::create_checkout_session(
            &db,
            &booking.id,
            &session.id,
            &(now + state.config.pending_ttl),
        )
    });
    if let Err(e) = recorded {
        tracing::error!(booking_id = %booking.id, session_id = %session.id, error = %e, "failed to record checkout, releasing slot");
        release_slot(state, &booking.id);
        return Err(AppError::Internal(e));
    }

    tracing::info!(booking_id = %booking.id, session_id = %session.id, "checkout opened");
    Ok(Reservation {
        booking,
        redirect_url: session.url,
    })
}

/// Compensating delete for a pending booking whose checkout never got going.
fn release_slot(state: &AppState, booking_id: &str) {
    let released = state
        .db()
        .and_then(|db| queries::delete_pending_booking(&db, booking_id));
    if let Err(e) = released {
        tracing::error!(booking_id, error = %e, "failed to release pending booking");
    }
}

async fn open_checkout(
    state: &AppState,
    product: &Product,
    booking: &Booking,
) -> anyhow::Result<CheckoutSession> {
    let item = CheckoutItem::for_product(product)?;
    let base = &state.config.base_url;
    let success_url = format!("{base}/booking/success?booking_id={}", booking.id);
    let cancel_url = format!("{base}/booking/cancel?booking_id={}", booking.id);

    tokio::time::timeout(
        state.config.gateway_timeout,
        state
            .payments
            .create_checkout(&item, &success_url, &cancel_url),
    )
    .await
    .context("checkout creation timed out")?
}

/// Success callback. Confirms a pending booking and sends the confirmation
/// notices. A booking that was already resolved is returned untouched.
pub fn confirm(
    state: &Arc<AppState>,
    booking_id: Option<&str>,
    payment_ref: Option<&str>,
) -> Result<Booking, AppError> {
    let Some(booking_id) = booking_id.filter(|id| !id.is_empty()) else {
        tracing::error!("payment success callback without a booking id");
        return Err(AppError::ResolutionInconsistency);
    };

    let (booking, product) = {
        let mut db = state.db()?;
        let tx = db.transaction()?;

        let Some(existing) = queries::get_booking_by_id(&tx, booking_id)? else {
            tracing::error!(booking_id, "payment success for unknown booking");
            return Err(AppError::ResolutionInconsistency);
        };
        if existing.status != BookingStatus::Pending {
            tracing::info!(booking_id, status = existing.status.as_str(), "booking already resolved");
            return Ok(existing);
        }

        let payment_ref = payment_ref
            .filter(|p| !p.is_empty())
            .unwrap_or(PAYMENT_REF_SENTINEL);
        queries::confirm_booking(&tx, booking_id, payment_ref)?;
        queries::complete_checkout_session(&tx, booking_id)?;

        let booking = queries::get_booking_by_id(&tx, booking_id)?
            .context("confirmed booking vanished")?;
        let product = queries::get_product(&tx, booking.product_id)?
            .context("booking references a missing product")?;
        tx.commit()?;
        (booking, product)
    };

    tracing::info!(
        booking_id = %booking.id,
        payment_ref = booking.payment_ref.as_deref().unwrap_or_default(),
        "booking confirmed"
    );
    spawn_confirmation_notices(state, booking.clone(), product);
    Ok(booking)
}

/// Cancel callback. Deletes the booking if it is still pending; anything
/// else, including an unknown id, is a no-op. Returns whether a row went.
pub fn cancel(state: &AppState, booking_id: Option<&str>) -> Result<bool, AppError> {
    let Some(booking_id) = booking_id.filter(|id| !id.is_empty()) else {
        return Ok(false);
    };

    let db = state.db()?;
    match queries::get_booking_by_id(&db, booking_id)? {
        Some(booking) if booking.status == BookingStatus::Pending => {
            let removed = queries::delete_pending_booking(&db, booking_id)?;
            tracing::info!(booking_id, "pending booking cancelled");
            Ok(removed)
        }
        Some(booking) => {
            tracing::warn!(
                booking_id,
                status = booking.status.as_str(),
                "cancel callback for resolved booking ignored"
            );
            Ok(false)
        }
        None => {
            tracing::debug!(booking_id, "cancel callback for unknown booking");
            Ok(false)
        }
    }
}

/// Drops pending bookings whose checkout has expired, plus pending rows that
/// never got a checkout and are older than the pending TTL.
pub fn sweep_expired(state: &AppState, now: NaiveDateTime) -> Result<usize, AppError> {
    let db = state.db()?;
    let removed = queries::delete_expired_pending(&db, &now, &(now - state.config.pending_ttl))?;
    if removed > 0 {
        tracing::info!(removed, "expired pending bookings swept");
    }
    Ok(removed)
}

pub fn spawn_sweeper(state: Arc<AppState>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_expired(&state, business_now()) {
                tracing::error!(error = %e, "pending sweep failed");
            }
        }
    });
}

/// Admin transition out of confirmed.
pub fn close_booking(
    state: &AppState,
    booking_id: &str,
    status: BookingStatus,
) -> Result<Booking, AppError> {
    if !matches!(status, BookingStatus::Completed | BookingStatus::Cancelled) {
        return Err(AppError::Conflict(format!(
            "bookings can only be marked completed or cancelled, not {}",
            status.as_str()
        )));
    }

    let db = state.db()?;
    let mut booking = queries::get_booking_by_id(&db, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    if booking.status != BookingStatus::Confirmed {
        return Err(AppError::Conflict(format!(
            "booking is {}, only confirmed bookings can be closed",
            booking.status.as_str()
        )));
    }

    queries::update_booking_status(&db, booking_id, status)?;
    booking.status = status;
    tracing::info!(booking_id, status = status.as_str(), "booking closed");
    Ok(booking)
}
