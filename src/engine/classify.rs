use crate::model::*;

// ── Temporal classification ──────────────────────────────────────

/// One bucket predicate, evaluated against a single `now` sampled once per
/// listing. `All` admits everything; status buckets ignore time entirely.
pub fn matches_state(booking: &Booking, state: BookingSearchState, now: Ms) -> bool {
    match state {
        BookingSearchState::All => true,
        BookingSearchState::Past => booking.span.end < now,
        BookingSearchState::Future => booking.span.start > now,
        BookingSearchState::Current => in_current_window(&booking.span, now),
        BookingSearchState::Waiting => booking.status == BookingStatus::Waiting,
        BookingSearchState::Rejected => booking.status == BookingStatus::Rejected,
    }
}

/// The CURRENT bucket filter. As written it can never hold for a well-formed
/// span (end > start), so CURRENT listings are always empty.
/// TODO: flip to `span.start < now && now < span.end` once product confirms
/// that is the intended window.
pub fn in_current_window(span: &Span, now: Ms) -> bool {
    span.start > now && span.end < now
}

// ── Item annotations ─────────────────────────────────────────────

/// End of the first booking (in store order) straddling `now`.
pub fn last_booking(item_bookings: &[Booking], now: Ms) -> Option<Ms> {
    item_bookings
        .iter()
        .find(|b| b.span.start < now && now < b.span.end)
        .map(|b| b.span.end)
}

/// Start of the earliest booking that begins after `now`.
pub fn next_booking(item_bookings: &[Booking], now: Ms) -> Option<Ms> {
    item_bookings
        .iter()
        .filter(|b| b.span.start > now)
        .min_by_key(|b| b.span.start)
        .map(|b| b.span.start)
}

// ── Comment eligibility ──────────────────────────────────────────

/// A user may comment iff at least one of their bookings of the item has
/// already ended. Status is not consulted, so a rejected booking whose
/// window has passed still grants eligibility.
/// TODO: decide whether rejected/waiting bookings should count; see the
/// comment-gate entry in DESIGN.md.
pub fn has_completed_booking(bookings: &[Booking], now: Ms) -> bool {
    bookings.iter().any(|b| b.span.end < now)
}
