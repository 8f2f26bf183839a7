/// Identity attached to a request by an upstream auth layer, if any. Only the
/// id is kept; it becomes the optional owner of a booking.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}
