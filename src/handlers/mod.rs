pub mod admin;
pub mod booking;
pub mod calendar;
pub mod health;
pub mod products;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use serde::Serialize;

use crate::db::queries::format_ts;
use crate::models::Booking;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/products", get(products::list_products))
        .route("/booking", post(booking::create_booking))
        .route("/booking/success", get(booking::booking_success))
        .route("/booking/cancel", get(booking::booking_cancel))
        .route("/calendar/:booking_id", get(calendar::download_ics))
        .route("/api/admin/stats", get(admin::get_stats))
        .route("/api/admin/bookings", get(admin::get_bookings))
        .route(
            "/api/admin/bookings/:id/status",
            post(admin::update_booking_status),
        )
        .route(
            "/api/admin/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/api/admin/products/:id",
            put(admin::update_product).delete(admin::delete_product),
        )
        .with_state(state)
}

#[derive(Serialize)]
pub struct BookingResponse {
    id: String,
    product_id: i64,
    user_id: Option<i64>,
    name: String,
    email: String,
    phone: String,
    start: String,
    end: String,
    notes: Option<String>,
    status: String,
    payment_ref: Option<String>,
    created_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            product_id: b.product_id,
            user_id: b.user_id,
            name: b.name,
            email: b.email,
            phone: b.phone,
            start: format_ts(&b.start),
            end: format_ts(&b.end),
            notes: b.notes,
            status: b.status.as_str().to_string(),
            payment_ref: b.payment_ref,
            created_at: format_ts(&b.created_at),
        }
    }
}
