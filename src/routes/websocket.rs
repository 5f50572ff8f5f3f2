use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    routes::matches::CallerId,
    services::websocket_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/ws",
    tag = "realtime",
    params(("X-Participant-Id" = Option<i64>, Header, description = "Verified participant identity; otherwise send `identify` first")),
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade the HTTP connection into a match WebSocket session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = match CallerId::from_headers(&headers) {
        Ok(identity) => identity.map(|CallerId(id)| id),
        Err(err) => return err.into_response(),
    };
    ws.on_upgrade(move |socket| websocket_service::handle_socket(state, socket, identity))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws", get(ws_handler))
}
