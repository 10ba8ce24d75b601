use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use crate::error::StoreError;
use crate::models::{BookingStatus, ReservationFilter};
use crate::notify::{Audience, BookingEvent, Notice, Notifier};
use crate::schedule::{ServiceClock, VenueTime};
use crate::store::RecordStore;

pub const DEFAULT_LEAD_MINUTES: i64 = 120;

/// Sends one reminder per approved booking shortly before it starts.
pub struct ReminderSweep {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    clock: ServiceClock,
    lead: Duration,
}

impl ReminderSweep {
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        clock: ServiceClock,
        lead_minutes: i64,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            lead: Duration::minutes(lead_minutes),
        }
    }

    /// One pass at venue-local `now`. Returns how many reminders went out.
    pub async fn run_once_at(&self, now: NaiveDateTime) -> Result<usize, StoreError> {
        // After-midnight starts belong to the previous booking date.
        let first = now.date() - Duration::days(1);
        let last = (now + self.lead).date();

        let mut sent = 0;
        for date in first.iter_days().take_while(|d| *d <= last) {
            let filter = ReservationFilter {
                date: Some(date),
                status: Some(BookingStatus::Approved),
                ..Default::default()
            };
            for booking in self.store.list_reservations(&filter).await? {
                if booking.reminder_sent {
                    continue;
                }
                let starts_at = self.clock.instant(booking.booking_date, booking.start_time);
                if !is_due(starts_at, now, self.lead) {
                    continue;
                }
                self.store.mark_reminder_sent(booking.id).await?;
                self.notifier.notify(Notice::for_booking(
                    Audience::Customer,
                    BookingEvent::BookingReminder,
                    &booking,
                ));
                sent += 1;
            }
        }
        Ok(sent)
    }
}

/// Start is still ahead and no further than `lead` away.
pub fn is_due(starts_at: NaiveDateTime, now: NaiveDateTime, lead: Duration) -> bool {
    starts_at > now && starts_at - now <= lead
}

/// Runs the sweep forever on a fixed interval.
pub fn spawn(sweep: Arc<ReminderSweep>, venue: VenueTime, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match sweep.run_once_at(venue.now()).await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Sent {} booking reminders", n),
                Err(e) => tracing::error!("Reminder sweep failed: {}", e),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::models::{NewReservation, Reservation};
    use crate::notify::RecordingNotifier;
    use crate::schedule::SlotGrid;
    use crate::store::{SqliteStore, WriteOutcome};
    use chrono::NaiveDate;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    async fn seed(store: &SqliteStore, start: &str, end: &str, status: BookingStatus) -> i64 {
        let new = NewReservation {
            field_name: "A".into(),
            customer_name: "Test".into(),
            phone: "0500000000".into(),
            booking_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
        };
        let WriteOutcome::Written(r) = store
            .create_reservation(&new, &|_: &[Reservation]| None)
            .await
            .unwrap()
        else {
            panic!("seed write blocked");
        };
        if status != BookingStatus::Pending {
            store.update_reservation_status(r.id, status, None).await.unwrap();
        }
        r.id
    }

    async fn sweep() -> (ReminderSweep, Arc<SqliteStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(SqliteStore::new(memory_pool().await));
        let notifier = Arc::new(RecordingNotifier::new());
        let sweep = ReminderSweep::new(
            store.clone(),
            notifier.clone(),
            SlotGrid::default().clock(),
            DEFAULT_LEAD_MINUTES,
        );
        (sweep, store, notifier)
    }

    #[test]
    fn due_window() {
        let lead = Duration::minutes(120);
        let now = at("2025-06-01 15:00");
        assert!(is_due(at("2025-06-01 17:00"), now, lead));
        assert!(is_due(at("2025-06-01 15:01"), now, lead));
        assert!(!is_due(at("2025-06-01 17:01"), now, lead));
        assert!(!is_due(at("2025-06-01 15:00"), now, lead));
        assert!(!is_due(at("2025-06-01 14:00"), now, lead));
    }

    #[tokio::test]
    async fn reminds_approved_bookings_once() {
        let (sweep, store, notifier) = sweep().await;
        let soon = seed(&store, "17:00", "18:30", BookingStatus::Approved).await;
        seed(&store, "21:30", "23:00", BookingStatus::Approved).await;
        seed(&store, "16:00", "17:00", BookingStatus::Pending).await;

        assert_eq!(sweep.run_once_at(at("2025-06-01 15:30")).await.unwrap(), 1);
        assert_eq!(
            notifier.events(),
            vec![(Audience::Customer, BookingEvent::BookingReminder)]
        );
        assert!(store.get_reservation(soon).await.unwrap().unwrap().reminder_sent);

        assert_eq!(sweep.run_once_at(at("2025-06-01 15:45")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn after_midnight_start_uses_next_calendar_day() {
        let (sweep, store, _notifier) = sweep().await;
        seed(&store, "00:30", "02:00", BookingStatus::Approved).await;

        // 00:30 on the 1st's service day is the early morning of the 2nd
        assert_eq!(sweep.run_once_at(at("2025-06-01 00:00")).await.unwrap(), 0);
        assert_eq!(sweep.run_once_at(at("2025-06-01 23:00")).await.unwrap(), 1);
    }
}
