//! Short-lived fallback for the booking id across the checkout redirect.
//!
//! The id travels in a `pending_booking_id` cookie as `{id}.{signature}`,
//! where the signature is base64(HMAC-SHA1(secret, id)).

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

pub const PENDING_BOOKING_COOKIE: &str = "pending_booking_id";
const COOKIE_PATH: &str = "/booking";

fn signature(secret: &str, value: &str) -> Option<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(value.as_bytes());
    let result = mac.finalize().into_bytes();
    Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(result))
}

pub fn sign(secret: &str, booking_id: &str) -> Option<String> {
    signature(secret, booking_id).map(|sig| format!("{booking_id}.{sig}"))
}

/// Returns the booking id if the signature checks out.
pub fn verify(secret: &str, signed: &str) -> Option<String> {
    let (booking_id, sig) = signed.rsplit_once('.')?;
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(booking_id.as_bytes());
    let sig = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(sig)
        .ok()?;
    mac.verify_slice(&sig).ok()?;
    Some(booking_id.to_string())
}

/// Remembers a freshly created booking for the callbacks.
pub fn remember(jar: CookieJar, secret: &str, booking_id: &str, ttl: chrono::Duration) -> CookieJar {
    let Some(signed) = sign(secret, booking_id) else {
        tracing::warn!(booking_id, "could not sign pending booking cookie");
        return jar;
    };
    let cookie = Cookie::build((PENDING_BOOKING_COOKIE, signed))
        .path(COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(ttl.num_seconds()));
    jar.add(cookie)
}

/// Expires the cookie whether or not the request carried one.
pub fn forget(jar: CookieJar) -> CookieJar {
    let mut cookie = Cookie::build((PENDING_BOOKING_COOKIE, ""))
        .path(COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    jar.add(cookie)
}

/// Pulls a verified booking id out of the request cookies.
pub fn pending_booking_id(jar: &CookieJar, secret: &str) -> Option<String> {
    let cookie = jar.get(PENDING_BOOKING_COOKIE)?;
    let verified = verify(secret, cookie.value());
    if verified.is_none() {
        tracing::warn!("rejected pending booking cookie with bad signature");
    }
    verified
}
