use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::BookingResponse;
use crate::errors::{AppError, ValidationError};
use crate::models::AuthenticatedUser;
use crate::services::reservation::{self, ReservationRequest};
use crate::services::scheduling::business_now;
use crate::session;
use crate::state::AppState;

const START_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

fn parse_start(raw: &str) -> Result<NaiveDateTime, ValidationError> {
    START_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
        .ok_or_else(|| ValidationError::InvalidField {
            field: "start",
            message: "must be a local date and time like 2025-06-15T14:00".to_string(),
        })
}

// POST /booking
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub product_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub start: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct CreateBookingResponse {
    booking_id: String,
    redirect_url: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthenticatedUser>>,
    jar: CookieJar,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(CookieJar, Json<CreateBookingResponse>), AppError> {
    let request = ReservationRequest {
        product_id: body.product_id,
        name: body.name,
        email: body.email,
        phone: body.phone,
        start: parse_start(&body.start)?,
        notes: body.notes,
        user_id: user.map(|Extension(u)| u.user_id),
    };

    let reservation = match reservation::reserve(&state, request, business_now()).await {
        Ok(r) => r,
        Err(AppError::Validation(reason)) => {
            tracing::info!(reason = reason.code(), "booking request rejected");
            return Err(AppError::Validation(reason));
        }
        Err(e) => return Err(e),
    };

    let jar = session::remember(
        jar,
        &state.config.session_secret,
        &reservation.booking.id,
        state.config.pending_ttl,
    );
    Ok((
        jar,
        Json(CreateBookingResponse {
            booking_id: reservation.booking.id,
            redirect_url: reservation.redirect_url,
        }),
    ))
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub booking_id: Option<String>,
    pub payment_intent: Option<String>,
}

/// Query parameter first, then the signed cookie set at checkout.
fn resolve_booking_id(query: &CallbackQuery, jar: &CookieJar, secret: &str) -> Option<String> {
    query
        .booking_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .or_else(|| session::pending_booking_id(jar, secret))
}

// GET /booking/success
pub async fn booking_success(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> (CookieJar, Response) {
    let booking_id = resolve_booking_id(&query, &jar, &state.config.session_secret);

    let response = match reservation::confirm(
        &state,
        booking_id.as_deref(),
        query.payment_intent.as_deref(),
    ) {
        Ok(booking) => Json(serde_json::json!({
            "message": "Your booking has been confirmed! You will receive a confirmation message shortly.",
            "booking": BookingResponse::from(booking),
        }))
        .into_response(),
        Err(e) => e.into_response(),
    };
    (session::forget(jar), response)
}

// GET /booking/cancel
pub async fn booking_cancel(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<(CookieJar, Json<serde_json::Value>), AppError> {
    let booking_id = resolve_booking_id(&query, &jar, &state.config.session_secret);
    reservation::cancel(&state, booking_id.as_deref())?;

    Ok((
        session::forget(jar),
        Json(serde_json::json!({
            "message": "Booking was cancelled. No payment was processed.",
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_formats() {
        assert_eq!(
            parse_start("2025-06-15T14:00").unwrap().to_string(),
            "2025-06-15 14:00:00"
        );
        assert_eq!(
            parse_start("2025-06-15T14:00:30").unwrap().to_string(),
            "2025-06-15 14:00:30"
        );
        assert!(matches!(
            parse_start("June 15th"),
            Err(ValidationError::InvalidField { field: "start", .. })
        ));
    }
}
