//! Request/response transport over HTTP.
//!
//! Every route resolves the caller from the session cookie (except the
//! lobby, which issues it), runs one operation, and answers with JSON.
//! Nothing here broadcasts: request/response callers only see their own
//! answer.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ghosthunt_protocol::{
    ErrorReply, GameRequest, GameResponse, LobbyAction, LobbyReply, RoomRequest,
};
use ghosthunt_room::RoomError;
use ghosthunt_session::{SessionError, cookie};
use serde::{Deserialize, Serialize};

use crate::GhostError;
use crate::server::ServerState;

/// Builds the HTTP routes over `state`.
pub(crate) fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api", post(lobby))
        .route("/game", post(game))
        .route("/room/{name}/membership", get(membership))
        .with_state(state)
}

/// Body of a successful membership check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipReply {
    pub roomname: String,
    pub username: String,
}

/// Failures surfaced to HTTP clients. The display text is the message
/// the client sees.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error("request unrecognized")]
    Unrecognized,
    #[error("invalid user")]
    InvalidUser,
    #[error("room not exists")]
    RoomNotFound,
    #[error("room already exists")]
    RoomExists,
    #[error("the username is already used")]
    NameTaken,
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unrecognized => StatusCode::BAD_REQUEST,
            Self::InvalidUser => StatusCode::UNAUTHORIZED,
            Self::RoomNotFound => StatusCode::NOT_FOUND,
            Self::RoomExists | Self::NameTaken => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorReply::new(self.to_string()))).into_response()
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::NotFound(_) => Self::RoomNotFound,
            RoomError::AlreadyExists(_) => Self::RoomExists,
            RoomError::NameTaken { .. } => Self::NameTaken,
            // The member is gone or the room is closing under us: the
            // credential no longer names anyone.
            RoomError::NotInRoom { .. } | RoomError::Unavailable(_) => {
                Self::InvalidUser
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(_: SessionError) -> Self {
        Self::InvalidUser
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        Self::Unrecognized
    }
}

impl From<GhostError> for ApiError {
    fn from(err: GhostError) -> Self {
        match err {
            GhostError::Session(e) => e.into(),
            GhostError::Room(e) => e.into(),
            other => {
                tracing::error!(error = %other, "request failed");
                Self::Internal
            }
        }
    }
}

fn cookie_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(COOKIE).and_then(|v| v.to_str().ok())
}

/// `POST /api`: create or enter a room and hand out the credential.
async fn lobby(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<RoomRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let registry = &state.registry;

    let (session, message) = match request.command {
        LobbyAction::Create => (
            registry
                .create_room(
                    &request.room_name,
                    &request.room_password,
                    &request.username,
                )
                .await?,
            "room created successfully",
        ),
        LobbyAction::Enter => (
            registry
                .enter_room(&request.room_name, &request.username)
                .await?,
            "user registered successfully",
        ),
    };

    let set_cookie =
        cookie::issue(&session.token, state.session_config.cookie_max_age_secs);
    Ok((
        [(SET_COOKIE, set_cookie)],
        Json(LobbyReply {
            roomname: session.room,
            message: message.to_owned(),
        }),
    ))
}

/// `POST /game`: run one in-round command for the caller.
async fn game(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Result<Json<GameRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // An unparseable body is rejected before the credential is looked at.
    let Json(request) = body?;
    let (session, room) = state.resolve(cookie_header(&headers)).await?;

    let dispatched = room.dispatch(&session, request).await?;
    tracing::debug!(
        room = %session.room,
        user = %session.username,
        command = %dispatched.response.command,
        outcome = ?dispatched.response.outcome,
        "command answered"
    );

    let expire = if dispatched.exited {
        state
            .registry
            .sessions()
            .lock()
            .await
            .revoke(&session.token);
        Some([(SET_COOKIE, cookie::expire())])
    } else {
        None
    };
    let response: GameResponse = dispatched.response;
    Ok((expire, Json(response)))
}

/// `GET /room/{name}/membership`: whether the caller belongs to `name`.
async fn membership(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MembershipReply>, ApiError> {
    let (session, room) = state
        .resolve(cookie_header(&headers))
        .await
        .map_err(|_| ApiError::RoomNotFound)?;
    if session.room != name {
        return Err(ApiError::RoomNotFound);
    }
    let member = room
        .member(&session)
        .await
        .map_err(|_| ApiError::RoomNotFound)?;

    Ok(Json(MembershipReply {
        roomname: session.room,
        username: member.username,
    }))
}
