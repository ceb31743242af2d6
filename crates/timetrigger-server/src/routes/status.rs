use axum::extract::State;
use axum::Json;
use timetrigger_core::ScheduleStatus;

use crate::state::AppState;

/// GET /status — phase and target of the current (or last) schedule.
pub async fn get_status(State(app): State<AppState>) -> Json<ScheduleStatus> {
    Json(app.scheduler.status())
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}
