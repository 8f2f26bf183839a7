use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::config::SchedulingRules;

/// Why a booking request was turned down. The `Display` text is shown to the
/// customer as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Booking must be at least {lead_hours} hours in advance.")]
    TooSoon { lead_hours: i64 },

    #[error(
        "Bookings are only available between {} and {}.",
        clock_hour(*.open_hour),
        clock_hour(*.close_hour)
    )]
    OutsideBusinessHours { open_hour: u32, close_hour: u32 },

    #[error("This time slot is not available.")]
    SlotUnavailable,

    #[error("You can only book one service per {window_days}-day period.")]
    LimitExceeded { window_days: i64 },

    #[error("Invalid service selected.")]
    InvalidProduct,

    #[error("{field}: {message}")]
    InvalidField { field: &'static str, message: String },
}

impl ValidationError {
    pub fn too_soon(rules: &SchedulingRules) -> Self {
        ValidationError::TooSoon {
            lead_hours: rules.lead_time.num_hours(),
        }
    }

    pub fn outside_hours(rules: &SchedulingRules) -> Self {
        ValidationError::OutsideBusinessHours {
            open_hour: rules.open_hour,
            close_hour: rules.close_hour,
        }
    }

    pub fn limit_exceeded(rules: &SchedulingRules) -> Self {
        ValidationError::LimitExceeded {
            window_days: rules.rate_limit_window.num_days(),
        }
    }

    /// Machine-readable reason returned next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::TooSoon { .. } => "too_soon",
            ValidationError::OutsideBusinessHours { .. } => "outside_business_hours",
            ValidationError::SlotUnavailable => "slot_unavailable",
            ValidationError::LimitExceeded { .. } => "limit_exceeded",
            ValidationError::InvalidProduct => "invalid_product",
            ValidationError::InvalidField { .. } => "invalid_field",
        }
    }
}

fn clock_hour(hour: u32) -> String {
    match hour % 24 {
        0 => "12 AM".to_string(),
        h @ 1..=11 => format!("{h} AM"),
        12 => "12 PM".to_string(),
        h => format!("{} PM", h - 12),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Payment processing is currently unavailable. Please try again later.")]
    PaymentUnavailable,

    #[error("Booking confirmation failed. Please contact us to verify your appointment.")]
    ResolutionInconsistency,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PaymentUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ResolutionInconsistency => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = match &self {
            AppError::Validation(reason) => serde_json::json!({
                "error": reason.to_string(),
                "reason": reason.code(),
            }),
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                serde_json::json!({ "error": "Something went wrong. Please try again later." })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_messages() {
        let rules = SchedulingRules::default();
        assert_eq!(
            ValidationError::too_soon(&rules).to_string(),
            "Booking must be at least 24 hours in advance."
        );
        assert_eq!(
            ValidationError::outside_hours(&rules).to_string(),
            "Bookings are only available between 5 AM and 6 PM."
        );
        assert_eq!(
            ValidationError::limit_exceeded(&rules).to_string(),
            "You can only book one service per 7-day period."
        );
    }

    #[test]
    fn test_fixed_and_field_messages() {
        assert_eq!(
            ValidationError::SlotUnavailable.to_string(),
            "This time slot is not available."
        );
        assert_eq!(
            ValidationError::InvalidProduct.to_string(),
            "Invalid service selected."
        );
        let field = ValidationError::InvalidField {
            field: "phone",
            message: "must be between 10 and 20 characters".to_string(),
        };
        assert_eq!(field.to_string(), "phone: must be between 10 and 20 characters");
    }

    #[test]
    fn test_clock_hour() {
        assert_eq!(clock_hour(0), "12 AM");
        assert_eq!(clock_hour(12), "12 PM");
        assert_eq!(clock_hour(17), "5 PM");
    }
}
