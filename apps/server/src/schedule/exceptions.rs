use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::SchedulingError;
use crate::models::{ExceptionFilter, ExceptionRecord, RangeOutcome};
use crate::store::RecordStore;

use super::grid::{split_range, SlotGrid};
use super::overlap::conflicts;
use super::time::Slot;

/// Upper bound on days written by one date-range exception.
pub const DEFAULT_MAX_RANGE_DAYS: u32 = 92;

/// Effective slot set per field-day, plus exception authoring.
pub struct ExceptionResolver {
    store: Arc<dyn RecordStore>,
    grid: SlotGrid,
    max_range_days: u32,
}

impl ExceptionResolver {
    pub fn new(store: Arc<dyn RecordStore>, grid: SlotGrid) -> Self {
        Self {
            store,
            grid,
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
        }
    }

    pub fn with_max_range_days(mut self, days: u32) -> Self {
        self.max_range_days = days;
        self
    }

    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    /// Stored custom slots when the day has an exception, else the default grid.
    pub async fn resolve(
        &self,
        field_name: &str,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, SchedulingError> {
        match self.store.get_exception(field_name, date).await? {
            Some(record) => Ok(record.custom_slots),
            None => Ok(self.grid.generate()),
        }
    }

    /// Splits coarse ranges into grid-length slots ordered on the service day.
    /// Ranges that overlap each other are refused.
    pub fn expand_ranges(&self, ranges: &[Slot]) -> Result<Vec<Slot>, SchedulingError> {
        if ranges.is_empty() {
            return Err(SchedulingError::validation(
                "at least one time range is required",
            ));
        }

        let clock = self.grid.clock();
        let mut slots = Vec::new();
        for range in ranges {
            slots.extend(split_range(*range, self.grid.slot_minutes(), clock)?);
        }
        slots.sort_by_key(|s| s.span(clock).start);

        if let Some(pair) = slots
            .windows(2)
            .find(|w| conflicts(&w[0].span(clock), &w[1].span(clock)))
        {
            return Err(SchedulingError::validation(format!(
                "time ranges overlap at {}-{} and {}-{}",
                pair[0].start, pair[0].end, pair[1].start, pair[1].end
            )));
        }
        Ok(slots)
    }

    pub async fn set_exception(
        &self,
        field_name: &str,
        date: NaiveDate,
        ranges: &[Slot],
        notes: Option<&str>,
    ) -> Result<ExceptionRecord, SchedulingError> {
        require_field(field_name)?;
        let slots = self.expand_ranges(ranges)?;
        let record = self
            .store
            .upsert_exception(field_name, date, &slots, notes)
            .await?;
        tracing::info!(
            "Exception set for {} on {}: {} slots",
            field_name,
            date,
            record.custom_slots.len()
        );
        Ok(record)
    }

    /// Writes the same exception to every day in `[start_date, end_date]`.
    /// Days are independent: a failed day is reported, the rest still land.
    pub async fn set_date_range_exception(
        &self,
        field_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        ranges: &[Slot],
        notes: Option<&str>,
    ) -> Result<RangeOutcome, SchedulingError> {
        require_field(field_name)?;
        if end_date < start_date {
            return Err(SchedulingError::validation(format!(
                "end date {} is before start date {}",
                end_date, start_date
            )));
        }
        let days = (end_date - start_date).num_days() as usize + 1;
        if days > self.max_range_days as usize {
            return Err(SchedulingError::validation(format!(
                "date range covers {} days, at most {} allowed",
                days, self.max_range_days
            )));
        }

        let slots = self.expand_ranges(ranges)?;
        let mut outcome = RangeOutcome {
            requested_days: days,
            written: 0,
            failed_dates: Vec::new(),
        };

        for date in start_date.iter_days().take(days) {
            match self
                .store
                .upsert_exception(field_name, date, &slots, notes)
                .await
            {
                Ok(_) => outcome.written += 1,
                Err(e) => {
                    tracing::warn!("Exception for {} on {} not written: {}", field_name, date, e);
                    outcome.failed_dates.push(date);
                }
            }
        }

        tracing::info!(
            "Range exception for {} {}..{}: {}/{} days written",
            field_name,
            start_date,
            end_date,
            outcome.written,
            outcome.requested_days
        );
        Ok(outcome)
    }

    pub async fn remove_exception(
        &self,
        field_name: &str,
        date: NaiveDate,
    ) -> Result<bool, SchedulingError> {
        let removed = self.store.delete_exception(field_name, date).await?;
        if removed {
            tracing::info!("Exception removed for {} on {}", field_name, date);
        }
        Ok(removed)
    }

    pub async fn list_exceptions(
        &self,
        filter: &ExceptionFilter,
    ) -> Result<Vec<ExceptionRecord>, SchedulingError> {
        Ok(self.store.list_exceptions(filter).await?)
    }
}

fn require_field(field_name: &str) -> Result<(), SchedulingError> {
    if field_name.trim().is_empty() {
        return Err(SchedulingError::validation("field name is required"));
    }
    Ok(())
}
