use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::{auth::Role, error::ApiError, models::*, AppState};

/// GET /api/admin/bookings: staff view, filterable by status/field/date.
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(filter): Query<ReservationFilter>,
) -> Result<Json<ApiResponse<Vec<Reservation>>>, ApiError> {
    state.access.require(&headers, Role::Staff)?;
    let bookings = state
        .store
        .list_reservations(&filter)
        .await
        .map_err(crate::error::SchedulingError::from)?;
    Ok(Json(ApiResponse::success(bookings)))
}

/// POST /api/admin/bookings/:id/approve
pub async fn approve_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Reservation>>, ApiError> {
    state.access.require(&headers, Role::Admin)?;
    let booking = state.lifecycle.approve(id).await?;
    Ok(Json(ApiResponse::success(booking)))
}

/// POST /api/admin/bookings/:id/reject: also cancels an approved booking.
pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Reservation>>, ApiError> {
    state.access.require(&headers, Role::Admin)?;
    let booking = state.lifecycle.reject(id).await?;
    Ok(Json(ApiResponse::success(booking)))
}

/// GET /api/admin/exceptions
pub async fn list_exceptions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(filter): Query<ExceptionFilter>,
) -> Result<Json<ApiResponse<Vec<ExceptionRecord>>>, ApiError> {
    state.access.require(&headers, Role::Admin)?;
    let exceptions = state
        .availability
        .resolver()
        .list_exceptions(&filter)
        .await?;
    Ok(Json(ApiResponse::success(exceptions)))
}

/// POST /api/admin/exceptions: replace one day's slots.
pub async fn set_exception(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SetExceptionRequest>,
) -> Result<Json<ApiResponse<ExceptionRecord>>, ApiError> {
    state.access.require(&headers, Role::Admin)?;
    let record = state
        .availability
        .resolver()
        .set_exception(&body.field_name, body.date, &body.slots, body.notes.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(record)))
}

/// POST /api/admin/exceptions/range: same slots for every day in a range.
pub async fn set_range_exception(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SetRangeExceptionRequest>,
) -> Result<Json<ApiResponse<RangeOutcome>>, ApiError> {
    state.access.require(&headers, Role::Admin)?;
    let outcome = state
        .availability
        .resolver()
        .set_date_range_exception(
            &body.field_name,
            body.start_date,
            body.end_date,
            &body.slots,
            body.notes.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// DELETE /api/admin/exceptions/:field_name/:date: back to the default grid.
pub async fn remove_exception(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((field_name, date)): Path<(String, NaiveDate)>,
) -> Result<Json<ApiResponse<RemovedResponse>>, ApiError> {
    state.access.require(&headers, Role::Admin)?;
    let removed = state
        .availability
        .resolver()
        .remove_exception(&field_name, date)
        .await?;
    Ok(Json(ApiResponse::success(RemovedResponse { removed })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::testing::{app, call, ADMIN, STAFF};

    async fn submit(app: &axum::Router, start: &str, end: &str) -> i64 {
        let (status, body) = call(
            app,
            "POST",
            "/api/bookings",
            None,
            Some(json!({
                "field_name": "A",
                "customer_name": "Noura",
                "phone": "0522222222",
                "booking_date": "2099-06-01",
                "start_time": start,
                "end_time": end,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_admin_routes_need_a_token() {
        let app = app().await;
        let (status, _) = call(&app, "GET", "/api/admin/bookings", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(&app, "GET", "/api/admin/bookings", Some("nope"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_staff_can_list_but_not_approve() {
        let app = app().await;
        let id = submit(&app, "16:00", "17:30").await;

        let (status, body) = call(&app, "GET", "/api/admin/bookings?status=pending", Some(STAFF), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let uri = format!("/api/admin/bookings/{}/approve", id);
        let (status, _) = call(&app, "POST", &uri, Some(STAFF), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_approval_marks_slot_booked() {
        let app = app().await;
        let id = submit(&app, "17:00", "18:30").await;

        let (status, body) = call(&app, "POST", &format!("/api/admin/bookings/{}/approve", id), Some(ADMIN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "approved");

        let (_, body) = call(&app, "GET", "/api/slots?field_name=A&date=2099-06-01", None, None).await;
        let booked: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|s| s["is_booked"] == true)
            .map(|s| s["start"].as_str().unwrap())
            .collect();
        assert_eq!(booked, vec!["17:00"]);
    }

    #[tokio::test]
    async fn test_unknown_booking_is_404() {
        let app = app().await;
        let (status, _) = call(&app, "POST", "/api/admin/bookings/41/reject", Some(ADMIN), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_exception_round_trip() {
        let app = app().await;
        let (status, body) = call(
            &app,
            "POST",
            "/api/admin/exceptions",
            Some(ADMIN),
            Some(json!({
                "field_name": "A",
                "date": "2099-06-10",
                "slots": [{ "start": "13:00", "end": "16:00" }],
                "notes": "school tournament",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["custom_slots"].as_array().unwrap().len(), 2);

        let (_, body) = call(&app, "GET", "/api/slots?field_name=A&date=2099-06-10", None, None).await;
        assert_eq!(body["data"][1], json!({ "start": "14:30", "end": "16:00", "is_booked": false }));

        let (status, body) = call(&app, "DELETE", "/api/admin/exceptions/A/2099-06-10", Some(ADMIN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["removed"], true);

        let (_, body) = call(&app, "GET", "/api/slots?field_name=A&date=2099-06-10", None, None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_range_exception_reports_counts() {
        let app = app().await;
        let (status, body) = call(
            &app,
            "POST",
            "/api/admin/exceptions/range",
            Some(ADMIN),
            Some(json!({
                "field_name": "B",
                "start_date": "2099-07-01",
                "end_date": "2099-07-05",
                "slots": [{ "start": "18:00", "end": "21:00" }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({ "requested_days": 5, "written": 5, "failed_dates": [] }));

        let (_, body) = call(
            &app,
            "GET",
            "/api/admin/exceptions?field_name=B&from=2099-07-02&to=2099-07-03",
            Some(ADMIN),
            None,
        )
        .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }
}
