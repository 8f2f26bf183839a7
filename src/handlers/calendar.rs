use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db::queries;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Response {
    // Strip .ics suffix if present
    let booking_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let loaded = state.db().and_then(|db| {
        let Some(booking) = queries::get_booking_by_id(&db, booking_id)? else {
            return Ok(None);
        };
        let service_name = queries::get_product(&db, booking.product_id)?
            .map(|p| p.name)
            .unwrap_or_else(|| "Detailing".to_string());
        Ok(Some((booking, service_name)))
    });

    let (booking, service_name) = match loaded {
        Ok(Some(found)) => found,
        Ok(None) => return (StatusCode::NOT_FOUND, "Booking not found").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load booking for .ics");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
        }
    };

    let ics = generate_ics(&booking, &service_name);
    let disposition = format!("attachment; filename=\"booking-{booking_id}.ics\"");

    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        ics,
    )
        .into_response()
}
