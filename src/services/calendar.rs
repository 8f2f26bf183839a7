use crate::models::{Booking, BookingStatus};

const ICS_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Renders a single-event iCalendar file for a booking.
pub fn generate_ics(booking: &Booking, service_name: &str) -> String {
    let dtstart = booking.start.format(ICS_FORMAT).to_string();
    let dtend = booking.end.format(ICS_FORMAT).to_string();
    let dtstamp = booking.created_at.format(ICS_FORMAT).to_string();
    let uid = format!("{}@detailbook", booking.id);

    let summary = escape_text(&format!("{service_name} appointment"));
    let description = escape_text(booking.notes.as_deref().unwrap_or("No additional notes"));
    let status = match booking.status {
        BookingStatus::Cancelled => "CANCELLED",
        BookingStatus::Pending => "TENTATIVE",
        _ => "CONFIRMED",
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Detailbook//Booking//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

// RFC 5545 TEXT escaping
fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}

/// Human-readable slot, e.g. "June 15, 2025 at 02:00 PM".
pub fn describe_slot(booking: &Booking) -> String {
    booking.start.format("%B %d, %Y at %I:%M %p").to_string()
}
