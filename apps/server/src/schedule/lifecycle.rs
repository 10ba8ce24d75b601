//! Reservation state machine.
//!
//! ```text
//! (new) ──submit──▶ pending ──approve──▶ approved
//!                      │                   │  ▲
//!                      └──reject──▶ rejected ─┘ (re-approve, re-checked)
//! ```
//!
//! Every path into a non-rejected state runs the overlap check twice: once as
//! a fast read, once inside the store's write transaction.

use std::sync::Arc;

use crate::error::SchedulingError;
use crate::models::{BookingStatus, NewReservation, Reservation};
use crate::notify::{Audience, BookingEvent, Notice, Notifier};
use crate::store::{RecordStore, WriteOutcome};

use super::availability::AvailabilityService;
use super::time::VenueTime;

pub struct BookingLifecycle {
    store: Arc<dyn RecordStore>,
    availability: Arc<AvailabilityService>,
    notifier: Arc<dyn Notifier>,
    venue: VenueTime,
}

impl BookingLifecycle {
    pub fn new(
        store: Arc<dyn RecordStore>,
        availability: Arc<AvailabilityService>,
        notifier: Arc<dyn Notifier>,
        venue: VenueTime,
    ) -> Self {
        Self {
            store,
            availability,
            notifier,
            venue,
        }
    }

    /// Trims names, reduces the phone to digits and checks the request shape.
    pub fn validate(&self, mut new: NewReservation) -> Result<NewReservation, SchedulingError> {
        new.field_name = new.field_name.trim().to_string();
        new.customer_name = new.customer_name.trim().to_string();
        new.phone = new.phone.chars().filter(|c| c.is_ascii_digit()).collect();

        if new.field_name.is_empty() {
            return Err(SchedulingError::validation("Field name is required"));
        }
        if new.customer_name.is_empty() {
            return Err(SchedulingError::validation("Customer name is required"));
        }
        if !is_local_mobile(&new.phone) {
            return Err(SchedulingError::validation(
                "Phone number must look like 05XXXXXXXX",
            ));
        }
        self.availability
            .validate_range(new.start_time, new.end_time)?;
        if new.booking_date < self.venue.today() {
            return Err(SchedulingError::validation(
                "Booking date is in the past",
            ));
        }
        Ok(new)
    }

    /// Creates a `pending` reservation when the range is free.
    pub async fn submit(&self, new: NewReservation) -> Result<Reservation, SchedulingError> {
        let new = self.validate(new)?;

        if let Some(hit) = self
            .availability
            .find_conflict(
                &new.field_name,
                new.booking_date,
                new.start_time,
                new.end_time,
                None,
            )
            .await?
        {
            return Err(SchedulingError::SlotConflict(hit.id));
        }

        let guard = self
            .availability
            .conflict_guard(new.start_time, new.end_time, None);
        let created = match self.store.create_reservation(&new, &guard).await? {
            WriteOutcome::Written(r) => r,
            WriteOutcome::Conflict(id) => return Err(SchedulingError::SlotConflict(id)),
        };

        tracing::info!(
            "Booking {} created: {} on {} {}-{}",
            created.id,
            created.field_name,
            created.booking_date,
            created.start_time,
            created.end_time
        );
        self.send(Audience::Admin, BookingEvent::BookingCreated, &created);
        Ok(created)
    }

    pub async fn approve(&self, id: i64) -> Result<Reservation, SchedulingError> {
        self.transition(id, BookingStatus::Approved).await
    }

    pub async fn reject(&self, id: i64) -> Result<Reservation, SchedulingError> {
        self.transition(id, BookingStatus::Rejected).await
    }

    /// Moves a reservation to `target`. Moving to the current status changes
    /// nothing and sends nothing.
    pub async fn transition(
        &self,
        id: i64,
        target: BookingStatus,
    ) -> Result<Reservation, SchedulingError> {
        let current = self
            .store
            .get_reservation(id)
            .await?
            .ok_or(SchedulingError::NotFound(id))?;

        if current.status == target {
            return Ok(current);
        }

        let updated = match target {
            BookingStatus::Pending => {
                return Err(SchedulingError::validation(
                    "A booking cannot be moved back to pending",
                ));
            }
            BookingStatus::Approved => self.write_approval(&current).await?,
            BookingStatus::Rejected => {
                match self
                    .store
                    .update_reservation_status(id, BookingStatus::Rejected, None)
                    .await?
                {
                    Some(WriteOutcome::Written(r)) => r,
                    Some(WriteOutcome::Conflict(other)) => {
                        return Err(SchedulingError::SlotConflict(other))
                    }
                    None => return Err(SchedulingError::NotFound(id)),
                }
            }
        };

        tracing::info!(
            "Booking {} moved {} -> {}",
            id,
            current.status,
            updated.status
        );
        match updated.status {
            BookingStatus::Approved => {
                self.send(Audience::Customer, BookingEvent::BookingApproved, &updated);
                self.send(Audience::Staff, BookingEvent::BookingApproved, &updated);
            }
            BookingStatus::Rejected => {
                self.send(Audience::Customer, BookingEvent::BookingRejected, &updated);
            }
            BookingStatus::Pending => {}
        }
        Ok(updated)
    }

    async fn write_approval(&self, current: &Reservation) -> Result<Reservation, SchedulingError> {
        if let Some(hit) = self
            .availability
            .find_conflict(
                &current.field_name,
                current.booking_date,
                current.start_time,
                current.end_time,
                Some(current.id),
            )
            .await?
        {
            return Err(SchedulingError::SlotConflict(hit.id));
        }

        let guard =
            self.availability
                .conflict_guard(current.start_time, current.end_time, Some(current.id));
        match self
            .store
            .update_reservation_status(current.id, BookingStatus::Approved, Some(&guard))
            .await?
        {
            Some(WriteOutcome::Written(r)) => Ok(r),
            Some(WriteOutcome::Conflict(other)) => Err(SchedulingError::SlotConflict(other)),
            None => Err(SchedulingError::NotFound(current.id)),
        }
    }

    fn send(&self, audience: Audience, event: BookingEvent, booking: &Reservation) {
        self.notifier
            .notify(Notice::for_booking(audience, event, booking));
    }
}

/// `05` followed by eight digits.
fn is_local_mobile(phone: &str) -> bool {
    phone.len() == 10 && phone.starts_with("05") && phone.bytes().all(|b| b.is_ascii_digit())
}
