use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::BookingResponse;
use crate::db::queries;
use crate::errors::{AppError, ValidationError};
use crate::models::{BookingStatus, Product, ProductInput};
use crate::services::reservation;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn parse_status(raw: &str) -> Result<BookingStatus, AppError> {
    BookingStatus::parse(raw).ok_or_else(|| {
        AppError::Validation(ValidationError::InvalidField {
            field: "status",
            message: format!("unknown status '{raw}'"),
        })
    })
}

// GET /api/admin/stats
#[derive(Serialize)]
pub struct StatsResponse {
    total_bookings: i64,
    pending_bookings: i64,
    confirmed_bookings: i64,
    total_revenue: String,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let stats = {
        let db = state.db()?;
        queries::get_dashboard_stats(&db)?
    };

    Ok(Json(StatsResponse {
        total_bookings: stats.total_bookings,
        pending_bookings: stats.pending_bookings,
        confirmed_bookings: stats.confirmed_bookings,
        total_revenue: stats.total_revenue.to_string(),
    }))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let status_filter = query.status.as_deref().map(parse_status).transpose()?;

    let bookings = {
        let db = state.db()?;
        queries::get_all_bookings(&db, status_filter, limit)?
    };

    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

// POST /api/admin/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = parse_status(&body.status)?;
    let booking = reservation::close_booking(&state, &id, status)?;
    Ok(Json(BookingResponse::from(booking)))
}

// GET /api/admin/products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Product>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let products = {
        let db = state.db()?;
        queries::list_products(&db, false)?
    };
    Ok(Json(products))
}

// POST /api/admin/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    body.check()?;

    let product = {
        let db = state.db()?;
        let id = queries::create_product(&db, &body)?;
        queries::get_product(&db, id)?
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?
    };

    tracing::info!(product_id = product.id, name = %product.name, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

// PUT /api/admin/products/:id
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    body.check()?;

    let product = {
        let db = state.db()?;
        if !queries::update_product(&db, id, &body)? {
            return Err(AppError::NotFound(format!("product {id}")));
        }
        queries::get_product(&db, id)?
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?
    };

    tracing::info!(product_id = id, "product updated");
    Ok(Json(product))
}

// DELETE /api/admin/products/:id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db()?;
    if queries::count_bookings_for_product(&db, id)? > 0 {
        return Err(AppError::Conflict(
            "Cannot delete product with existing bookings.".to_string(),
        ));
    }
    if !queries::delete_product(&db, id)? {
        return Err(AppError::NotFound(format!("product {id}")));
    }

    tracing::info!(product_id = id, "product deleted");
    Ok(Json(serde_json::json!({"ok": true})))
}
