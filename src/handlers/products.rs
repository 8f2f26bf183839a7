use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Product;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub active: bool,
}

// GET /api/products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = {
        let db = state.db()?;
        queries::list_products(&db, query.active)?
    };
    Ok(Json(products))
}
