use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::SchedulingError;
use crate::models::{BookingStatus, Reservation, ReservationFilter, SlotAvailability};
use crate::store::RecordStore;

use super::exceptions::ExceptionResolver;
use super::overlap::first_conflict;
use super::time::{ServiceClock, ServiceSpan, TimeOfDay};

/// Answers "is this range free" and "which slots are taken" for a field-day.
pub struct AvailabilityService {
    store: Arc<dyn RecordStore>,
    resolver: Arc<ExceptionResolver>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn RecordStore>, resolver: Arc<ExceptionResolver>) -> Self {
        Self { store, resolver }
    }

    pub fn resolver(&self) -> &ExceptionResolver {
        &self.resolver
    }

    pub fn clock(&self) -> ServiceClock {
        self.resolver.grid().clock()
    }

    /// Places a requested range on the service day. The range must end after
    /// it starts; it may cross midnight only up to the rollover.
    pub fn validate_range(
        &self,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<ServiceSpan, SchedulingError> {
        self.clock().checked_span(start, end).ok_or_else(|| {
            SchedulingError::validation(format!(
                "time range {}-{} does not end after it starts",
                start, end
            ))
        })
    }

    /// Fail-safe check: any store failure reads as "not available".
    pub async fn is_available(
        &self,
        field_name: &str,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> bool {
        match self.find_conflict(field_name, date, start, end, None).await {
            Ok(None) => true,
            Ok(Some(_)) => false,
            Err(e) => {
                tracing::warn!(
                    "Availability for {} on {} {}-{} denied: {}",
                    field_name,
                    date,
                    start,
                    end,
                    e
                );
                false
            }
        }
    }

    /// First non-rejected reservation on the field-day that overlaps
    /// `[start, end)`, skipping `exclude`.
    pub async fn find_conflict(
        &self,
        field_name: &str,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
        exclude: Option<i64>,
    ) -> Result<Option<Reservation>, SchedulingError> {
        let requested = self.validate_range(start, end)?;
        let existing = self
            .store
            .list_reservations(&ReservationFilter::field_day(field_name, date))
            .await?;
        Ok(first_conflict(self.clock(), &requested, &existing, exclude).cloned())
    }

    /// Same rule as [`find_conflict`](Self::find_conflict), packaged for the
    /// store to evaluate inside its write transaction.
    pub fn conflict_guard(
        &self,
        start: TimeOfDay,
        end: TimeOfDay,
        exclude: Option<i64>,
    ) -> impl Fn(&[Reservation]) -> Option<i64> + Send + Sync {
        let clock = self.clock();
        let requested = clock.span(start, end);
        move |existing: &[Reservation]| {
            first_conflict(clock, &requested, existing, exclude).map(|r| r.id)
        }
    }

    /// Effective slots for the day. A slot shows as booked only when an
    /// approved reservation has exactly its boundaries.
    pub async fn list_slots_with_availability(
        &self,
        field_name: &str,
        date: NaiveDate,
    ) -> Result<Vec<SlotAvailability>, SchedulingError> {
        let slots = self.resolver.resolve(field_name, date).await?;
        let approved = self
            .store
            .list_reservations(
                &ReservationFilter::field_day(field_name, date)
                    .with_status(BookingStatus::Approved),
            )
            .await?;

        Ok(slots
            .into_iter()
            .map(|slot| SlotAvailability {
                slot,
                is_booked: approved.iter().any(|r| r.slot() == slot),
            })
            .collect())
    }
}
