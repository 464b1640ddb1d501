use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use otr_shared::clients::db;
use otr_shared::errors::AppResult;
use otr_shared::middleware::{ensure_admin_session, SessionContext};
use otr_shared::types::api::{Ack, ApiResponse};

use crate::services::verification;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetAutomatedChecksRequest {
    #[validate(range(min = 1, message = "tournament id must be positive"))]
    pub id: i32,
    pub override_verified_state: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TournamentIdRequest {
    #[validate(range(min = 1, message = "tournament id must be positive"))]
    pub id: i32,
}

#[derive(Debug, Serialize)]
pub struct RefetchMatchDataResponse {
    pub count: usize,
}

// --- Reset automated checks ---

pub async fn reset_automated_checks(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    body: Result<Json<ResetAutomatedChecksRequest>, JsonRejection>,
) -> AppResult<Json<Ack>> {
    let admin = ensure_admin_session(&session)?;
    let Json(body) = body?;
    body.validate()?;

    let mut conn = db::checkout(&state.db)?;
    let counts = verification::reset_automated_checks(
        &mut *conn,
        admin,
        body.id,
        body.override_verified_state,
    )?;

    counter!("verification_cascades_total", "operation" => "reset_automated_checks").increment(1);
    tracing::info!(
        tournament_id = body.id,
        admin_user_id = admin.admin_user_id,
        override_verified_state = body.override_verified_state,
        tournaments = counts.tournaments,
        matches = counts.matches,
        games = counts.games,
        game_scores = counts.game_scores,
        "automated checks reset"
    );

    Ok(Json(Ack::ok()))
}

// --- Accept pre-verification statuses ---

pub async fn accept_pre_verification_statuses(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    body: Result<Json<TournamentIdRequest>, JsonRejection>,
) -> AppResult<Json<Ack>> {
    let admin = ensure_admin_session(&session)?;
    let Json(body) = body?;
    body.validate()?;

    let mut conn = db::checkout(&state.db)?;
    let counts = verification::accept_pre_verification_statuses(&mut *conn, admin, body.id)?;

    counter!("verification_cascades_total", "operation" => "accept_pre_verification_statuses").increment(1);
    tracing::info!(
        tournament_id = body.id,
        admin_user_id = admin.admin_user_id,
        rows = counts.total(),
        "pre-verification statuses accepted"
    );

    Ok(Json(Ack::ok()))
}

// --- Refetch match data ---

pub async fn refetch_match_data(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    body: Result<Json<TournamentIdRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<RefetchMatchDataResponse>>> {
    let admin = ensure_admin_session(&session)?;
    let Json(body) = body?;
    body.validate()?;

    let mut conn = db::checkout(&state.db)?;
    let count = verification::refetch_match_data(&mut *conn, admin, body.id)?;

    tracing::info!(
        tournament_id = body.id,
        admin_user_id = admin.admin_user_id,
        count,
        "matches queued for refetch"
    );

    Ok(Json(ApiResponse::ok(RefetchMatchDataResponse { count })))
}
