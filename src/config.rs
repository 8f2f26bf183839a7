use std::env;
use std::time::Duration as StdDuration;

use chrono::Duration;

/// Booking rules applied by the slot validator and the rate limiter.
#[derive(Clone, Debug)]
pub struct SchedulingRules {
    /// Minimum distance between now and a booking's start.
    pub lead_time: Duration,
    /// First hour of the day a booking may start at (inclusive).
    pub open_hour: u32,
    /// Hour of the day from which bookings may no longer start (exclusive).
    pub close_hour: u32,
    pub service_duration: Duration,
    /// Lookback used for the one-booking-per-contact limit.
    pub rate_limit_window: Duration,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            lead_time: Duration::hours(24),
            open_hour: 5,
            close_hour: 18,
            service_duration: Duration::hours(2),
            rate_limit_window: Duration::days(7),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub base_url: String,
    pub session_secret: String,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub owner_phone: String,
    pub pending_ttl: Duration,
    pub gateway_timeout: StdDuration,
    pub sweep_interval: Option<StdDuration>,
    pub rules: SchedulingRules,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = SchedulingRules::default();
        let rules = SchedulingRules {
            lead_time: hours_or(parse_var("BOOKING_LEAD_HOURS"), defaults.lead_time),
            open_hour: parse_var("BUSINESS_OPEN_HOUR").unwrap_or(defaults.open_hour),
            close_hour: parse_var("BUSINESS_CLOSE_HOUR").unwrap_or(defaults.close_hour),
            ..defaults
        };

        Self {
            port: parse_var("PORT").unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "detailbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            base_url: env::var("BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            session_secret: env::var("SESSION_SECRET").unwrap_or_else(|_| "changeme".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            owner_phone: env::var("OWNER_PHONE").unwrap_or_default(),
            pending_ttl: pending_ttl_from(parse_var("PENDING_TTL_MINUTES")),
            gateway_timeout: StdDuration::from_secs(parse_var("GATEWAY_TIMEOUT_SECS").unwrap_or(10)),
            sweep_interval: match parse_var::<u64>("SWEEP_INTERVAL_SECS").unwrap_or(300) {
                0 => None,
                secs => Some(StdDuration::from_secs(secs)),
            },
            rules,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Out-of-range values fall back to the default instead of overflowing.
fn hours_or(raw: Option<i64>, default: Duration) -> Duration {
    raw.and_then(Duration::try_hours).unwrap_or(default)
}

const DEFAULT_PENDING_TTL_MINUTES: i64 = 60;
/// Never shorter than the processor's own checkout expiry floor.
const MIN_PENDING_TTL_MINUTES: i64 = 30;

fn pending_ttl_from(raw: Option<i64>) -> Duration {
    let minutes = raw
        .unwrap_or(DEFAULT_PENDING_TTL_MINUTES)
        .max(MIN_PENDING_TTL_MINUTES);
    Duration::try_minutes(minutes)
        .unwrap_or_else(|| Duration::minutes(DEFAULT_PENDING_TTL_MINUTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_time_override() {
        let default = SchedulingRules::default().lead_time;
        assert_eq!(hours_or(Some(48), default), Duration::hours(48));
        assert_eq!(hours_or(None, default), default);
        assert_eq!(hours_or(Some(i64::MAX), default), default);
    }

    #[test]
    fn test_pending_ttl_bounds() {
        assert_eq!(pending_ttl_from(None), Duration::minutes(60));
        assert_eq!(pending_ttl_from(Some(10)), Duration::minutes(30));
        assert_eq!(pending_ttl_from(Some(90)), Duration::minutes(90));
        assert_eq!(pending_ttl_from(Some(i64::MAX)), Duration::minutes(60));
    }
}
