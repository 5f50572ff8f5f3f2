use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the bingo duel backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::matches::create_match,
        crate::routes::matches::join_match,
        crate::routes::matches::get_active_match,
        crate::routes::matches::get_match,
        crate::routes::matches::check_cell,
        crate::routes::matches::resume_match,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::JoinMatchRequest,
            crate::dto::matches::CheckCellRequest,
            crate::dto::matches::MatchView,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::NoticeKind,
            crate::state::match_machine::MatchStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "matches", description = "Match creation, moves and lookups"),
        (name = "realtime", description = "WebSocket match channels"),
    )
)]
pub struct ApiDoc;
