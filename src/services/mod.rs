pub mod calendar;
pub mod messaging;
pub mod notifications;
pub mod payment;
pub mod rate_limit;
pub mod reservation;
pub mod scheduling;
