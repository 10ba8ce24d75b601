//! Fire-and-forget booking notices.
//!
//! Callers never wait on delivery and never see a delivery failure; a failed
//! send is logged and dropped.

use serde::Serialize;

use crate::models::Reservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Customer,
    Staff,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEvent {
    BookingCreated,
    BookingApproved,
    BookingRejected,
    BookingReminder,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub audience: Audience,
    pub event: BookingEvent,
    pub title: String,
    pub body: String,
    #[serde(rename = "data")]
    pub booking: Reservation,
}

impl Notice {
    pub fn for_booking(audience: Audience, event: BookingEvent, booking: &Reservation) -> Self {
        let (title, body) = match event {
            BookingEvent::BookingCreated => (
                "New booking".to_string(),
                format!(
                    "New booking from {} for field {}",
                    booking.customer_name, booking.field_name
                ),
            ),
            BookingEvent::BookingApproved if audience == Audience::Customer => (
                "Booking confirmed".to_string(),
                format!(
                    "Your booking at {} on {} {}-{} is confirmed",
                    booking.field_name, booking.booking_date, booking.start_time, booking.end_time
                ),
            ),
            BookingEvent::BookingApproved => (
                "Booking approved".to_string(),
                format!(
                    "{} - {} - {} {}",
                    booking.customer_name,
                    booking.field_name,
                    booking.booking_date,
                    booking.start_time
                ),
            ),
            BookingEvent::BookingRejected => (
                "Booking declined".to_string(),
                format!(
                    "Your booking at {} on {} {}-{} could not be accepted",
                    booking.field_name, booking.booking_date, booking.start_time, booking.end_time
                ),
            ),
            BookingEvent::BookingReminder => (
                "Booking reminder".to_string(),
                format!(
                    "Reminder: {} on {} at {}",
                    booking.field_name, booking.booking_date, booking.start_time
                ),
            ),
        };
        Self {
            audience,
            event,
            title,
            body,
            booking: booking.clone(),
        }
    }
}

/// Notification dispatcher. Must not block the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Posts each notice as JSON to a webhook from a spawned task.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, notice: Notice) {
        let client = self.client.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            let sent = client
                .post(&url)
                .json(&notice)
                .send()
                .await
                .and_then(|resp| resp.error_for_status());
            if let Err(e) = sent {
                tracing::error!(
                    "Failed to send {:?} notice for booking {}: {}",
                    notice.event,
                    notice.booking.id,
                    e
                );
            }
        });
    }
}

/// Used when no webhook is configured.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        tracing::info!(
            "Notice to {:?} ({:?}) for booking {}: {}",
            notice.audience,
            notice.event,
            notice.booking.id,
            notice.body
        );
    }
}

#[cfg(test)]
pub(crate) struct RecordingNotifier {
    pub sent: std::sync::Mutex<Vec<Notice>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<(Audience, BookingEvent)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| (n.audience, n.event))
            .collect()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.sent.lock().unwrap().push(notice);
    }
}
