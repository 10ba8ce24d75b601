//! Record store boundary: reservations and day exceptions.
//!
//! The scheduling core only talks to [`RecordStore`]. Rows are parsed into
//! typed records here, so a malformed stored time surfaces as
//! [`StoreError::Corrupt`] instead of leaking strings into the engine.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::StoreError;
use crate::models::{
    BookingStatus, ExceptionFilter, ExceptionRecord, NewReservation, Reservation,
    ReservationFilter,
};
use crate::schedule::Slot;

/// Conflict rule evaluated inside the write transaction. Given the field-day's
/// non-rejected reservations, returns the id of the one that blocks the write.
pub type ConflictGuard<'a> = &'a (dyn Fn(&[Reservation]) -> Option<i64> + Send + Sync);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(Reservation),
    Conflict(i64),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_reservations(
        &self,
        filter: &ReservationFilter,
    ) -> Result<Vec<Reservation>, StoreError>;

    async fn get_reservation(&self, id: i64) -> Result<Option<Reservation>, StoreError>;

    /// Inserts a `pending` reservation iff `guard` finds no conflict.
    async fn create_reservation(
        &self,
        new: &NewReservation,
        guard: ConflictGuard<'_>,
    ) -> Result<WriteOutcome, StoreError>;

    /// `Ok(None)` when the id does not exist.
    async fn update_reservation_status(
        &self,
        id: i64,
        status: BookingStatus,
        guard: Option<ConflictGuard<'_>>,
    ) -> Result<Option<WriteOutcome>, StoreError>;

    async fn mark_reminder_sent(&self, id: i64) -> Result<(), StoreError>;

    async fn get_exception(
        &self,
        field_name: &str,
        date: NaiveDate,
    ) -> Result<Option<ExceptionRecord>, StoreError>;

    async fn list_exceptions(
        &self,
        filter: &ExceptionFilter,
    ) -> Result<Vec<ExceptionRecord>, StoreError>;

    async fn upsert_exception(
        &self,
        field_name: &str,
        date: NaiveDate,
        slots: &[Slot],
        notes: Option<&str>,
    ) -> Result<ExceptionRecord, StoreError>;

    async fn delete_exception(&self, field_name: &str, date: NaiveDate)
        -> Result<bool, StoreError>;
}

// ── SQLite implementation ──

const RESERVATION_COLUMNS: &str = "id, field_name, customer_name, phone, booking_date,
     start_time, end_time, status, reminder_sent, created_at";

const EXCEPTION_COLUMNS: &str = "field_name, exception_date, custom_slots, notes, created_at";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i64,
    field_name: String,
    customer_name: String,
    phone: String,
    booking_date: String,
    start_time: String,
    end_time: String,
    status: String,
    reminder_sent: bool,
    created_at: String,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let key = row.id.to_string();
        let bad = |reason: String| StoreError::Corrupt {
            table: "bookings",
            key: key.clone(),
            reason,
        };
        Ok(Reservation {
            id: row.id,
            booking_date: parse_date(&row.booking_date).map_err(&bad)?,
            start_time: row.start_time.parse().map_err(|e| bad(format!("{e}")))?,
            end_time: row.end_time.parse().map_err(|e| bad(format!("{e}")))?,
            status: row.status.parse().map_err(&bad)?,
            field_name: row.field_name,
            customer_name: row.customer_name,
            phone: row.phone,
            reminder_sent: row.reminder_sent,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExceptionRow {
    field_name: String,
    exception_date: String,
    custom_slots: String,
    notes: Option<String>,
    created_at: String,
}

impl TryFrom<ExceptionRow> for ExceptionRecord {
    type Error = StoreError;

    fn try_from(row: ExceptionRow) -> Result<Self, Self::Error> {
        let bad = |reason: String| StoreError::Corrupt {
            table: "daily_exceptions",
            key: format!("{}/{}", row.field_name, row.exception_date),
            reason,
        };
        let exception_date = parse_date(&row.exception_date).map_err(&bad)?;
        let custom_slots: Vec<Slot> =
            serde_json::from_str(&row.custom_slots).map_err(|e| bad(e.to_string()))?;
        Ok(ExceptionRecord {
            field_name: row.field_name,
            exception_date,
            custom_slots,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("bad date {raw:?}: {e}"))
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn now_stamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn fetch_reservation(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Reservation>, StoreError> {
    let query = format!("SELECT {} FROM bookings WHERE id = ?", RESERVATION_COLUMNS);
    sqlx::query_as::<_, ReservationRow>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Reservation::try_from)
        .transpose()
}

async fn fetch_active_on_field_day(
    conn: &mut SqliteConnection,
    field_name: &str,
    date: NaiveDate,
) -> Result<Vec<Reservation>, StoreError> {
    let query = format!(
        "SELECT {} FROM bookings
         WHERE field_name = ? AND booking_date = ? AND status != 'rejected'",
        RESERVATION_COLUMNS
    );
    sqlx::query_as::<_, ReservationRow>(&query)
        .bind(field_name)
        .bind(date_key(date))
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Reservation::try_from)
        .collect()
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn list_reservations(
        &self,
        filter: &ReservationFilter,
    ) -> Result<Vec<Reservation>, StoreError> {
        let query = format!(
            "SELECT {} FROM bookings
             WHERE (?1 IS NULL OR field_name = ?1)
               AND (?2 IS NULL OR booking_date = ?2)
               AND (?3 IS NULL OR status = ?3)
             ORDER BY created_at DESC, id DESC",
            RESERVATION_COLUMNS
        );
        sqlx::query_as::<_, ReservationRow>(&query)
            .bind(filter.field_name.as_deref())
            .bind(filter.date.map(date_key))
            .bind(filter.status.map(BookingStatus::as_str))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Reservation::try_from)
            .collect()
    }

    async fn get_reservation(&self, id: i64) -> Result<Option<Reservation>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fetch_reservation(&mut conn, id).await
    }

    async fn create_reservation(
        &self,
        new: &NewReservation,
        guard: ConflictGuard<'_>,
    ) -> Result<WriteOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = fetch_active_on_field_day(&mut tx, &new.field_name, new.booking_date).await?;
        if let Some(blocking) = guard(&existing) {
            tx.rollback().await?;
            return Ok(WriteOutcome::Conflict(blocking));
        }

        let id = sqlx::query(
            "INSERT INTO bookings (field_name, customer_name, phone, booking_date,
             start_time, end_time, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)",
        )
        .bind(&new.field_name)
        .bind(&new.customer_name)
        .bind(&new.phone)
        .bind(date_key(new.booking_date))
        .bind(new.start_time.to_string())
        .bind(new.end_time.to_string())
        .bind(now_stamp())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let created = fetch_reservation(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::Corrupt {
                table: "bookings",
                key: id.to_string(),
                reason: "row vanished after insert".into(),
            })?;
        tx.commit().await?;
        Ok(WriteOutcome::Written(created))
    }

    async fn update_reservation_status(
        &self,
        id: i64,
        status: BookingStatus,
        guard: Option<ConflictGuard<'_>>,
    ) -> Result<Option<WriteOutcome>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(current) = fetch_reservation(&mut tx, id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(guard) = guard {
            let siblings =
                fetch_active_on_field_day(&mut tx, &current.field_name, current.booking_date)
                    .await?;
            if let Some(blocking) = guard(&siblings) {
                tx.rollback().await?;
                return Ok(Some(WriteOutcome::Conflict(blocking)));
            }
        }

        sqlx::query("UPDATE bookings SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let updated = fetch_reservation(&mut tx, id).await?.unwrap_or(Reservation {
            status,
            ..current
        });
        tx.commit().await?;
        Ok(Some(WriteOutcome::Written(updated)))
    }

    async fn mark_reminder_sent(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE bookings SET reminder_sent = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_exception(
        &self,
        field_name: &str,
        date: NaiveDate,
    ) -> Result<Option<ExceptionRecord>, StoreError> {
        let query = format!(
            "SELECT {} FROM daily_exceptions WHERE field_name = ? AND exception_date = ?",
            EXCEPTION_COLUMNS
        );
        sqlx::query_as::<_, ExceptionRow>(&query)
            .bind(field_name)
            .bind(date_key(date))
            .fetch_optional(&self.pool)
            .await?
            .map(ExceptionRecord::try_from)
            .transpose()
    }

    async fn list_exceptions(
        &self,
        filter: &ExceptionFilter,
    ) -> Result<Vec<ExceptionRecord>, StoreError> {
        let query = format!(
            "SELECT {} FROM daily_exceptions
             WHERE (?1 IS NULL OR field_name = ?1)
               AND (?2 IS NULL OR exception_date >= ?2)
               AND (?3 IS NULL OR exception_date <= ?3)
             ORDER BY exception_date ASC, field_name ASC",
            EXCEPTION_COLUMNS
        );
        sqlx::query_as::<_, ExceptionRow>(&query)
            .bind(filter.field_name.as_deref())
            .bind(filter.from.map(date_key))
            .bind(filter.to.map(date_key))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ExceptionRecord::try_from)
            .collect()
    }

    async fn upsert_exception(
        &self,
        field_name: &str,
        date: NaiveDate,
        slots: &[Slot],
        notes: Option<&str>,
    ) -> Result<ExceptionRecord, StoreError> {
        let encoded = serde_json::to_string(slots)?;
        sqlx::query(
            "INSERT INTO daily_exceptions (field_name, exception_date, custom_slots, notes, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (field_name, exception_date)
             DO UPDATE SET custom_slots = excluded.custom_slots, notes = excluded.notes",
        )
        .bind(field_name)
        .bind(date_key(date))
        .bind(&encoded)
        .bind(notes)
        .bind(now_stamp())
        .execute(&self.pool)
        .await?;

        self.get_exception(field_name, date)
            .await?
            .ok_or_else(|| StoreError::Corrupt {
                table: "daily_exceptions",
                key: format!("{}/{}", field_name, date),
                reason: "row vanished after upsert".into(),
            })
    }

    async fn delete_exception(
        &self,
        field_name: &str,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM daily_exceptions WHERE field_name = ? AND exception_date = ?")
                .bind(field_name)
                .bind(date_key(date))
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
