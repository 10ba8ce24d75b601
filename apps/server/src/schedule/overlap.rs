use crate::models::Reservation;

use super::time::{ServiceClock, ServiceSpan};

/// Strict interval intersection. Back-to-back ranges do not conflict.
pub fn conflicts(a: &ServiceSpan, b: &ServiceSpan) -> bool {
    a.start < b.end && a.end > b.start
}

/// First non-rejected reservation whose range intersects `requested`.
///
/// `exclude` skips one reservation id, used when re-checking a reservation
/// against its own field-day.
pub fn first_conflict<'a, I>(
    clock: ServiceClock,
    requested: &ServiceSpan,
    existing: I,
    exclude: Option<i64>,
) -> Option<&'a Reservation>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    existing.into_iter().find(|r| {
        r.is_active() && Some(r.id) != exclude && conflicts(requested, &r.span(clock))
    })
}
