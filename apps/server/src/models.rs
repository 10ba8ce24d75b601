use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schedule::{ServiceClock, ServiceSpan, Slot, TimeOfDay};

// ── Domain records ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "approved" => Ok(BookingStatus::Approved),
            "rejected" => Ok(BookingStatus::Rejected),
            other => Err(format!("unknown booking status {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub id: i64,
    pub field_name: String,
    pub customer_name: String,
    pub phone: String,
    pub booking_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: BookingStatus,
    pub created_at: String,
    pub reminder_sent: bool,
}

impl Reservation {
    pub fn slot(&self) -> Slot {
        Slot {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn span(&self, clock: ServiceClock) -> ServiceSpan {
        clock.span(self.start_time, self.end_time)
    }

    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Rejected
    }
}

/// Customer booking request. Status is always `pending` on creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub field_name: String,
    pub customer_name: String,
    pub phone: String,
    pub booking_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionRecord {
    pub field_name: String,
    pub exception_date: NaiveDate,
    pub custom_slots: Vec<Slot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationFilter {
    pub field_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<BookingStatus>,
}

impl ReservationFilter {
    pub fn field_day(field_name: &str, date: NaiveDate) -> Self {
        Self {
            field_name: Some(field_name.to_string()),
            date: Some(date),
            status: None,
        }
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExceptionFilter {
    pub field_name: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ── API request/response types ──

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub field_name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    #[serde(flatten)]
    pub slot: Slot,
    pub is_booked: bool,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub field_name: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetExceptionRequest {
    pub field_name: String,
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRangeExceptionRequest {
    pub field_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub slots: Vec<Slot>,
    pub notes: Option<String>,
}

/// Per-day result of a date-range exception. Days are written one by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeOutcome {
    pub requested_days: usize,
    pub written: usize,
    pub failed_dates: Vec<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
