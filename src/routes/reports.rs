use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::{NewReport, Report};
use crate::domain::ReportStatus;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::{non_empty, success, Success};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reports", get(list).post(create))
        .route("/api/reports/{id}", patch(review))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub post_id: Option<String>,
    pub reporter_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub status: Option<String>,
}

async fn create(
    State(state): State<AppState>,
    caller: MaybeUser,
    Json(body): Json<CreateReportRequest>,
) -> AppResult<Json<Report>> {
    let (Some(post_id), Some(reporter_id), Some(reason)) = (
        non_empty(body.post_id),
        non_empty(body.reporter_id),
        non_empty(body.reason),
    ) else {
        return Err(AppError::BadRequest(
            "PostId, reporterId, and reason are required".into(),
        ));
    };
    caller.ensure_is(&reporter_id)?;

    if state.storage.get_user(&reporter_id)?.is_none() {
        return Err(AppError::NotFound("User"));
    }

    let report = state.storage.create_report(NewReport {
        post_id,
        reporter_id,
        reason,
    })?;
    Ok(Json(report))
}

fn require_admin(caller: &CurrentUser) -> AppResult<()> {
    if caller.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

async fn list(State(state): State<AppState>, caller: CurrentUser) -> AppResult<Json<Vec<Report>>> {
    require_admin(&caller)?;
    Ok(Json(state.storage.list_reports()?))
}

async fn review(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> AppResult<Json<Success>> {
    require_admin(&caller)?;

    let status: ReportStatus = non_empty(body.status)
        .ok_or_else(|| AppError::BadRequest("Status is required".into()))?
        .parse()
        .map_err(AppError::BadRequest)?;

    if !state.storage.update_report_status(&id, status)? {
        return Err(AppError::NotFound("Report"));
    }
    tracing::info!(report_id = %id, status = %status.as_str(), by = %caller.id, "Report reviewed");
    Ok(success())
}
