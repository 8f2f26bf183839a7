pub mod booking;
pub mod product;
pub mod user;

pub use booking::{Booking, BookingStatus, CheckoutStatus};
pub use product::{Product, ProductInput, ProductStatus};
pub use user::AuthenticatedUser;
