//! HTTP handlers. Each one extracts the caller, delegates to the game
//! service and serializes the result.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use pirho_core::models::{
    answer::{AnswerOutcome, SubmitAnswer},
    invite::{Invite, InviteStatus, InviteSummary, InviteeRef},
    leaderboard::{PlayerStanding, SessionStanding},
    participant::{Participant, ParticipantSummary},
    session::{NewSession, Session, SessionDetail, SessionFilter, SessionProduct, SessionStatus},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AuthPrincipal, MaybePrincipal};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/status", patch(transition_status))
        .route("/sessions/:id/join", post(join_session))
        .route("/sessions/:id/participants", get(list_participants))
        .route("/sessions/:id/products", get(session_products))
        .route("/sessions/:id/answer", post(submit_answer))
        .route("/sessions/:id/leaderboard", get(session_leaderboard))
        .route("/sessions/:id/invite", post(send_invite))
        .route("/sessions/:id/invites", get(session_invites))
        .route("/invites", get(received_invites))
        .route("/invites/sent", get(sent_invites))
        .route("/invites/:id", delete(cancel_invite))
        .route("/invites/:id/accept", post(accept_invite))
        .route("/invites/:id/reject", post(reject_invite))
        .route("/leaderboard/session/:id", get(session_leaderboard))
        .route("/leaderboard/global", get(global_leaderboard))
        .route("/leaderboard/friends", get(friends_leaderboard))
}

// ---------------------------------------------------------------------------
// Request bodies and query strings
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: SessionStatus,
}

/// Exactly one field is needed. When several are given the id wins, then
/// the email, then the username.
#[derive(Debug, Default, Deserialize)]
pub struct InviteBody {
    pub invitee_id: Option<Uuid>,
    pub invitee_username: Option<String>,
    pub invitee_email: Option<String>,
}

impl InviteBody {
    fn into_ref(self) -> Result<InviteeRef, ApiError> {
        let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

        if let Some(id) = self.invitee_id {
            Ok(InviteeRef::Id(id))
        } else if let Some(email) = non_blank(self.invitee_email) {
            Ok(InviteeRef::Email(email))
        } else if let Some(username) = non_blank(self.invitee_username) {
            Ok(InviteeRef::Username(username))
        } else {
            Err(ApiError::MalformedPayload(
                "one of invitee_id, invitee_email or invitee_username is required".into(),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceivedQuery {
    pub status: Option<InviteStatus>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

async fn create_session(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(input): Json<NewSession>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let session = state.service.create_session(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn list_sessions(
    State(state): State<AppState>,
    MaybePrincipal(viewer): MaybePrincipal,
    Query(filter): Query<SessionFilter>,
) -> ApiResult<Json<Vec<Session>>> {
    let sessions = state.service.list_sessions(filter, viewer.as_ref()).await?;
    Ok(Json(sessions))
}

async fn get_session(
    State(state): State<AppState>,
    MaybePrincipal(viewer): MaybePrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionDetail>> {
    Ok(Json(state.service.get_session(id, viewer.as_ref()).await?))
}

async fn delete_session(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.delete_session(id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn transition_status(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<Session>> {
    let session = state
        .service
        .transition_status(id, &principal, body.status)
        .await?;
    Ok(Json(session))
}

async fn join_session(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<Participant>)> {
    let participant = state.service.join_session(id, &principal).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

async fn list_participants(
    State(state): State<AppState>,
    MaybePrincipal(viewer): MaybePrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ParticipantSummary>>> {
    Ok(Json(state.service.list_participants(id, viewer.as_ref()).await?))
}

async fn session_products(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<SessionProduct>>> {
    Ok(Json(state.service.get_session_products(id, &principal).await?))
}

async fn submit_answer(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(input): Json<SubmitAnswer>,
) -> ApiResult<Json<AnswerOutcome>> {
    Ok(Json(state.service.submit_answer(id, &principal, input).await?))
}

async fn session_leaderboard(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<SessionStanding>>> {
    Ok(Json(state.service.session_leaderboard(id, &principal).await?))
}

// ---------------------------------------------------------------------------
// Invites
// ---------------------------------------------------------------------------

async fn send_invite(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(body): Json<InviteBody>,
) -> ApiResult<(StatusCode, Json<Invite>)> {
    let invitee = body.into_ref()?;
    let invite = state.service.send_invite(id, &principal, invitee).await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

async fn session_invites(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<InviteSummary>>> {
    Ok(Json(state.service.list_session_invites(id, &principal).await?))
}

async fn received_invites(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(query): Query<ReceivedQuery>,
) -> ApiResult<Json<Vec<InviteSummary>>> {
    let invites = state
        .service
        .list_received_invites(&principal, query.status)
        .await?;
    Ok(Json(invites))
}

async fn sent_invites(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> ApiResult<Json<Vec<InviteSummary>>> {
    Ok(Json(state.service.list_sent_invites(&principal).await?))
}

async fn accept_invite(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Participant>> {
    Ok(Json(state.service.accept_invite(id, &principal).await?))
}

async fn reject_invite(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Invite>> {
    Ok(Json(state.service.reject_invite(id, &principal).await?))
}

async fn cancel_invite(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.cancel_invite(id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Leaderboards
// ---------------------------------------------------------------------------

async fn global_leaderboard(
    State(state): State<AppState>,
    MaybePrincipal(viewer): MaybePrincipal,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<PlayerStanding>>> {
    let standings = state
        .service
        .global_leaderboard(query.limit, viewer.as_ref())
        .await?;
    Ok(Json(standings))
}

async fn friends_leaderboard(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> ApiResult<Json<Vec<PlayerStanding>>> {
    Ok(Json(state.service.friends_leaderboard(&principal).await?))
}
