use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    use crate::limits::*;
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("booking window too wide"));
    }
    Ok(())
}

/// Find a live booking of the same item whose window overlaps `span`.
/// Rejected and canceled requests never block a slot.
pub(crate) fn find_overlap(existing: &[Booking], span: &Span) -> Option<i64> {
    existing
        .iter()
        .find(|b| {
            matches!(b.status, BookingStatus::Waiting | BookingStatus::Approved)
                && b.span.overlaps(span)
        })
        .map(|b| b.id)
}
