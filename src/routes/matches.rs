use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::{HeaderMap, StatusCode, request::Parts},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::matches::{CheckCellRequest, CreateMatchRequest, JoinMatchRequest, MatchView},
    error::AppError,
    services::match_service,
    state::{SharedState, bingo::ParticipantId},
};

/// Header carrying the verified participant identity.
pub const PARTICIPANT_HEADER: &str = "x-participant-id";

/// Verified identity of the caller, read from [`PARTICIPANT_HEADER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub ParticipantId);

impl CallerId {
    /// Parse the identity header, if present and well formed.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, AppError> {
        let Some(value) = headers.get(PARTICIPANT_HEADER) else {
            return Ok(None);
        };
        value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<ParticipantId>().ok())
            .map(|id| Some(CallerId(id)))
            .ok_or_else(|| {
                AppError::BadRequest("header `X-Participant-Id` must be an integer".into())
            })
    }
}

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)?.ok_or_else(|| {
            AppError::Unauthorized("missing participant header `X-Participant-Id`".into())
        })
    }
}

/// Match endpoints acting on behalf of the calling participant.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/matches", post(create_match))
        .route("/matches/active", get(get_active_match))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/join", post(join_match))
        .route("/matches/{id}/cells", post(check_cell))
        .route("/matches/{id}/resume", post(resume_match))
}

/// Open a new match with the caller as creator.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "matches",
    params(("X-Participant-Id" = i64, Header, description = "Verified participant identity")),
    request_body = CreateMatchRequest,
    responses(
        (status = 201, description = "Match created", body = MatchView),
        (status = 400, description = "Selection is not 24 distinct cards"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    CallerId(caller): CallerId,
    Valid(Json(payload)): Valid<Json<CreateMatchRequest>>,
) -> Result<(StatusCode, Json<MatchView>), AppError> {
    let view = match_service::create_match(&state, caller, payload.selected_card_ids).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Take the second seat of a waiting match.
#[utoipa::path(
    post,
    path = "/matches/{id}/join",
    tag = "matches",
    params(
        ("X-Participant-Id" = i64, Header, description = "Verified participant identity"),
        ("id" = String, Path, description = "Identifier of the match to join")
    ),
    request_body = JoinMatchRequest,
    responses(
        (status = 200, description = "Match started", body = MatchView),
        (status = 404, description = "No such match"),
        (status = 409, description = "Match already has two players or is no longer waiting")
    )
)]
pub async fn join_match(
    State(state): State<SharedState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<JoinMatchRequest>>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(
        match_service::join_match(&state, id, caller, payload.selected_card_ids).await?,
    ))
}

/// Most recent unfinished match of the caller.
#[utoipa::path(
    get,
    path = "/matches/active",
    tag = "matches",
    params(("X-Participant-Id" = i64, Header, description = "Verified participant identity")),
    responses(
        (status = 200, description = "Active match", body = MatchView),
        (status = 404, description = "Caller has no active match")
    )
)]
pub async fn get_active_match(
    State(state): State<SharedState>,
    CallerId(caller): CallerId,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(
        match_service::get_active_match_for_participant(&state, caller).await?,
    ))
}

/// Retrieve a match the caller takes part in.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "matches",
    params(
        ("X-Participant-Id" = i64, Header, description = "Verified participant identity"),
        ("id" = String, Path, description = "Identifier of the match to retrieve")
    ),
    responses(
        (status = 200, description = "Match", body = MatchView),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "No such match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(match_service::get_match(&state, id, caller).await?))
}

/// Toggle one cell of the caller's own board.
#[utoipa::path(
    post,
    path = "/matches/{id}/cells",
    tag = "matches",
    params(
        ("X-Participant-Id" = i64, Header, description = "Verified participant identity"),
        ("id" = String, Path, description = "Identifier of the match")
    ),
    request_body = CheckCellRequest,
    responses(
        (status = 200, description = "Updated match", body = MatchView),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "No such match"),
        (status = 409, description = "Match is not in progress"),
        (status = 422, description = "Card is not on the caller's board")
    )
)]
pub async fn check_cell(
    State(state): State<SharedState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
    Json(payload): Json<CheckCellRequest>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(
        match_service::check_cell(&state, id, caller, payload.card_id).await?,
    ))
}

/// Continue a paused match.
#[utoipa::path(
    post,
    path = "/matches/{id}/resume",
    tag = "matches",
    params(
        ("X-Participant-Id" = i64, Header, description = "Verified participant identity"),
        ("id" = String, Path, description = "Identifier of the match")
    ),
    responses(
        (status = 200, description = "Resumed match", body = MatchView),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "No such match"),
        (status = 409, description = "Match is not paused")
    )
)]
pub async fn resume_match(
    State(state): State<SharedState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(match_service::resume_match(&state, id, caller).await?))
}
