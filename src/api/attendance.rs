use crate::auth::auth::ViewerSession;
use crate::error::AppResult;
use crate::utils::{permission_filter::apply_user_filter, roster_cache::RosterStore};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttendanceListResponse {
    #[schema(example = "承認対象スタッフ")]
    pub label: String,
    #[schema(example = 2)]
    pub count: usize,
    #[schema(example = json!(["社員番号", "名前", "総残業時間"]))]
    pub columns: Vec<String>,
    #[schema(example = json!([["E100", "佐藤花子", "12:30:00"], ["E200", "伊藤健", "3:00:00"]]))]
    pub rows: Vec<Vec<String>>,
    /// Present only when `rows` is empty.
    pub empty_message: Option<String>,
}

/// Attendance rows visible to the current viewer
#[utoipa::path(
    get,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Filtered attendance rows", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Spreadsheet unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    session: ViewerSession,
    store: web::Data<RosterStore>,
) -> AppResult<HttpResponse> {
    let roster = store.get().await?;
    let joined = roster.joined();
    let visible = apply_user_filter(&joined, &session);

    debug!(
        employee_id = %session.employee_id,
        total = joined.len(),
        visible = visible.len(),
        "Attendance filtered"
    );

    let columns = roster.attendance.display_columns();
    let rows: Vec<Vec<String>> = visible.iter().map(|r| r.project(&columns)).collect();

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        label: session.scope_label().to_string(),
        count: rows.len(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        empty_message: rows
            .is_empty()
            .then(|| session.empty_message().to_string()),
        rows,
    }))
}

/// Drop the cached spreadsheet load (system admin)
#[utoipa::path(
    post,
    path = "/api/attendance/refresh",
    responses(
        (status = 204, description = "Cache cleared"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn refresh_attendance(
    session: ViewerSession,
    store: web::Data<RosterStore>,
) -> actix_web::Result<HttpResponse> {
    session.require_admin()?;
    store.invalidate().await;
    Ok(HttpResponse::NoContent().finish())
}
