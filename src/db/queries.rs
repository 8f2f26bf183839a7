use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::models::{
    Booking, BookingStatus, CheckoutStatus, Product, ProductInput, ProductStatus,
};
use crate::models::product::normalize_price;

pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).with_context(|| format!("bad timestamp: {s}"))
}

// ── Products ──

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, status, is_membership, stripe_price_id, created_at";

pub fn list_products(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<Product>> {
    let sql = if active_only {
        format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE status = 'active' ORDER BY id ASC")
    } else {
        format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC")
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_product_row(row)))?;

    let mut products = vec![];
    for row in rows {
        products.push(row??);
    }
    Ok(products)
}

pub fn get_product(conn: &Connection, id: i64) -> anyhow::Result<Option<Product>> {
    let product = conn
        .query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
            params![id],
            |row| Ok(parse_product_row(row)),
        )
        .optional()?;
    product.transpose()
}

pub fn create_product(conn: &Connection, input: &ProductInput) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO products (name, description, price, status, is_membership, stripe_price_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.name,
            input.description,
            normalize_price(input.price).to_string(),
            input.status.as_str(),
            input.is_membership,
            input.stripe_price_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_product(conn: &Connection, id: i64, input: &ProductInput) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE products SET name = ?1, description = ?2, price = ?3, status = ?4,
                is_membership = ?5, stripe_price_id = ?6
         WHERE id = ?7",
        params![
            input.name,
            input.description,
            normalize_price(input.price).to_string(),
            input.status.as_str(),
            input.is_membership,
            input.stripe_price_id,
            id,
        ],
    )?;
    Ok(count > 0)
}

pub fn count_bookings_for_product(conn: &Connection, product_id: i64) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE product_id = ?1",
        params![product_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn delete_product(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM products WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// Seeds the catalog on first start: one bookable detail and three
/// upcoming services.
pub fn seed_default_products(conn: &Connection) -> anyhow::Result<usize> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(0);
    }

    let defaults = [
        (
            "Premium Mobile Detail",
            "Complete interior and exterior detailing service. Includes wash, wax, interior cleaning, and tire shine.",
            Decimal::new(7500, 2),
            ProductStatus::Active,
            false,
        ),
        (
            "Ceramic Coating Package",
            "Professional ceramic coating application for long-lasting protection.",
            Decimal::new(29900, 2),
            ProductStatus::ComingSoon,
            false,
        ),
        (
            "Paint Correction Service",
            "Multi-stage paint correction to remove swirl marks and scratches.",
            Decimal::new(45000, 2),
            ProductStatus::ComingSoon,
            false,
        ),
        (
            "Monthly Maintenance Plan",
            "Monthly mobile detailing subscription for ongoing vehicle care.",
            Decimal::new(12000, 2),
            ProductStatus::ComingSoon,
            true,
        ),
    ];

    for (name, description, price, status, is_membership) in &defaults {
        create_product(
            conn,
            &ProductInput {
                name: name.to_string(),
                description: Some(description.to_string()),
                price: *price,
                status: *status,
                is_membership: *is_membership,
                stripe_price_id: None,
            },
        )?;
    }
    Ok(defaults.len())
}

fn parse_product_row(row: &rusqlite::Row) -> anyhow::Result<Product> {
    let price_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let created_at_str: String = row.get(7)?;

    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: Decimal::from_str(&price_str)
            .with_context(|| format!("bad product price: {price_str}"))?,
        status: ProductStatus::parse(&status_str)
            .with_context(|| format!("unknown product status: {status_str}"))?,
        is_membership: row.get(5)?,
        stripe_price_id: row.get(6)?,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, user_id, product_id, name, email, phone, start_time, end_time, notes, status, payment_ref, created_at";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, product_id, name, email, phone, start_time, end_time, notes, status, payment_ref, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            booking.user_id,
            booking.product_id,
            booking.name,
            booking.email,
            booking.phone,
            format_ts(&booking.start),
            format_ts(&booking.end),
            booking.notes,
            booking.status.as_str(),
            booking.payment_ref,
            format_ts(&booking.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let booking = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;
    booking.transpose()
}

/// Active bookings whose slot touches `[from, to)`.
pub fn get_active_bookings_in_range(
    conn: &Connection,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE status IN ('pending', 'confirmed') AND start_time < ?2 AND end_time > ?1
         ORDER BY start_time ASC"
    ))?;
    let rows = stmt.query_map(params![format_ts(from), format_ts(to)], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Active bookings for `email` starting at or after `since`.
pub fn get_active_bookings_for_email(
    conn: &Connection,
    email: &str,
    since: &NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE email = ?1 AND status IN ('pending', 'confirmed') AND start_time >= ?2
         ORDER BY start_time ASC"
    ))?;
    let rows = stmt.query_map(params![email, format_ts(since)], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Moves a pending booking to confirmed. Returns false when the booking is
/// missing or no longer pending.
pub fn confirm_booking(conn: &Connection, id: &str, payment_ref: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'confirmed', payment_ref = ?1
         WHERE id = ?2 AND status = 'pending'",
        params![payment_ref, id],
    )?;
    Ok(count > 0)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_pending_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM bookings WHERE id = ?1 AND status = 'pending'",
        params![id],
    )?;
    Ok(count > 0)
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.as_str()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT ?1"),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub struct DashboardStats {
    pub total_bookings: i64,
    pub pending_bookings: i64,
    pub confirmed_bookings: i64,
    pub total_revenue: Decimal,
}

pub fn get_dashboard_stats(conn: &Connection) -> anyhow::Result<DashboardStats> {
    let (total_bookings, pending_bookings, confirmed_bookings): (i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(status = 'pending'), 0),
                COALESCE(SUM(status = 'confirmed'), 0)
         FROM bookings",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    // Prices are stored as decimal text, so the sum happens here.
    let mut stmt = conn.prepare(
        "SELECT p.price FROM bookings b JOIN products p ON p.id = b.product_id
         WHERE b.status IN ('confirmed', 'completed')",
    )?;
    let prices = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut total_revenue = normalize_price(Decimal::ZERO);
    for price in prices {
        let price = price?;
        total_revenue += Decimal::from_str(&price)
            .with_context(|| format!("bad product price: {price}"))?;
    }

    Ok(DashboardStats {
        total_bookings,
        pending_bookings,
        confirmed_bookings,
        total_revenue,
    })
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start_str: String = row.get(6)?;
    let end_str: String = row.get(7)?;
    let status_str: String = row.get(9)?;
    let created_at_str: String = row.get(11)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        product_id: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        start: parse_ts(&start_str)?,
        end: parse_ts(&end_str)?,
        notes: row.get(8)?,
        status: BookingStatus::parse(&status_str)
            .with_context(|| format!("unknown booking status: {status_str}"))?,
        payment_ref: row.get(10)?,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Checkout Sessions ──

pub fn create_checkout_session(
    conn: &Connection,
    booking_id: &str,
    session_id: &str,
    expires_at: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO checkout_sessions (booking_id, session_id, status, expires_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(booking_id) DO UPDATE SET
           session_id = excluded.session_id,
           status = excluded.status,
           expires_at = excluded.expires_at",
        params![
            booking_id,
            session_id,
            CheckoutStatus::Open.as_str(),
            format_ts(expires_at)
        ],
    )?;
    Ok(())
}

pub fn complete_checkout_session(conn: &Connection, booking_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE checkout_sessions SET status = ?1 WHERE booking_id = ?2",
        params![CheckoutStatus::Completed.as_str(), booking_id],
    )?;
    Ok(count > 0)
}

pub fn get_checkout_session_id(conn: &Connection, booking_id: &str) -> anyhow::Result<Option<String>> {
    let session_id = conn
        .query_row(
            "SELECT session_id FROM checkout_sessions WHERE booking_id = ?1",
            params![booking_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(session_id)
}

/// Deletes pending bookings whose checkout expired at or before `now`, and
/// pending bookings that never got a checkout and were created at or before
/// `orphan_cutoff`. Checkout rows go with them via the cascade.
pub fn delete_expired_pending(
    conn: &Connection,
    now: &NaiveDateTime,
    orphan_cutoff: &NaiveDateTime,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM bookings
         WHERE status = 'pending'
           AND (
             id IN (SELECT booking_id FROM checkout_sessions WHERE status = 'open' AND expires_at <= ?1)
             OR (id NOT IN (SELECT booking_id FROM checkout_sessions) AND created_at <= ?2)
           )",
        params![format_ts(now), format_ts(orphan_cutoff)],
    )?;
    Ok(count)
}
