use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::{error::ApiError, models::*, AppState};

/// GET /api/slots: effective slots for a field-day with booked flags.
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SlotsQuery>,
) -> Result<Json<ApiResponse<Vec<SlotAvailability>>>, ApiError> {
    let slots = state
        .availability
        .list_slots_with_availability(&q.field_name, q.date)
        .await?;
    Ok(Json(ApiResponse::success(slots)))
}

/// GET /api/availability: is an arbitrary range free? A malformed range is
/// a 400; a store failure still reads as unavailable.
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<AvailabilityResponse>>, ApiError> {
    state.availability.validate_range(q.start_time, q.end_time)?;
    let available = state
        .availability
        .is_available(&q.field_name, q.date, q.start_time, q.end_time)
        .await;
    Ok(Json(ApiResponse::success(AvailabilityResponse { available })))
}

/// POST /api/bookings: submit a booking request (starts pending).
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewReservation>,
) -> Result<Json<ApiResponse<Reservation>>, ApiError> {
    let booking = state.lifecycle.submit(body).await?;
    Ok(Json(ApiResponse::success(booking)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::testing::{app, call};

    fn booking(start: &str, end: &str) -> serde_json::Value {
        json!({
            "field_name": "A",
            "customer_name": "Faisal",
            "phone": "0511111111",
            "booking_date": "2099-06-01",
            "start_time": start,
            "end_time": end,
        })
    }

    #[tokio::test]
    async fn test_default_day_lists_nine_free_slots() {
        let app = app().await;
        let (status, body) = call(&app, "GET", "/api/slots?field_name=A&date=2099-06-01", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let slots = body["data"].as_array().unwrap();
        assert_eq!(slots.len(), 9);
        assert_eq!(slots[0], json!({ "start": "15:30", "end": "17:00", "is_booked": false }));
        assert_eq!(slots[5]["start"], "23:00");
        assert_eq!(slots[5]["end"], "00:30");
    }

    #[tokio::test]
    async fn test_booking_then_overlap_is_409() {
        let app = app().await;
        let (status, body) = call(&app, "POST", "/api/bookings", None, Some(booking("16:00", "17:30"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "pending");

        let (status, body) = call(&app, "POST", "/api/bookings", None, Some(booking("17:00", "18:00"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["ok"], false);

        let (status, _) = call(&app, "POST", "/api/bookings", None, Some(booking("17:30:00", "19:00"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_availability_query() {
        let app = app().await;
        call(&app, "POST", "/api/bookings", None, Some(booking("16:00", "17:30"))).await;

        let (_, body) = call(
            &app,
            "GET",
            "/api/availability?field_name=A&date=2099-06-01&start_time=17:00&end_time=18:00",
            None,
            None,
        )
        .await;
        assert_eq!(body["data"]["available"], false);

        let (_, body) = call(
            &app,
            "GET",
            "/api/availability?field_name=A&date=2099-06-01&start_time=17:30&end_time=19:00",
            None,
            None,
        )
        .await;
        assert_eq!(body["data"]["available"], true);
    }

    #[tokio::test]
    async fn test_malformed_availability_range_is_400() {
        let app = app().await;
        for (start, end) in [("18:00", "18:00"), ("17:00", "16:00")] {
            let uri = format!(
                "/api/availability?field_name=A&date=2099-06-01&start_time={start}&end_time={end}"
            );
            let (status, body) = call(&app, "GET", &uri, None, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{start}-{end}");
            assert_eq!(body["ok"], false);
        }
    }

    #[tokio::test]
    async fn test_inverted_booking_is_400() {
        let app = app().await;
        let (status, _) = call(&app, "POST", "/api/bookings", None, Some(booking("17:00", "16:00"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "POST", "/api/bookings", None, Some(booking("23:00", "00:30"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_phone_is_400() {
        let app = app().await;
        let mut req = booking("16:00", "17:30");
        req["phone"] = json!("123");
        let (status, body) = call(&app, "POST", "/api/bookings", None, Some(req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("05XXXXXXXX"));
    }
}
