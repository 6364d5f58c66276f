use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, ProtectedResponse, RegisterRequest},
        extractors::{require_auth, AuthUser},
        services::AuthGateway,
    },
    error::{AppError, MessageBody},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/protected", get(protected))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[instrument(skip(gateway, payload))]
pub async fn register(
    State(gateway): State<AuthGateway>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageBody>, AppError> {
    let Json(payload) = payload?;
    gateway
        .register(payload.email.as_deref(), payload.password.as_deref())
        .await?;
    Ok(Json(MessageBody::new("Registration successful")))
}

#[instrument(skip(gateway, payload))]
pub async fn login(
    State(gateway): State<AuthGateway>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let outcome = gateway
        .login(payload.email.as_deref(), payload.password.as_deref())
        .await?;
    Ok(Json(LoginResponse {
        userid: outcome.user_id,
        token: outcome.token,
    }))
}

#[instrument]
pub async fn protected(AuthUser(user_id): AuthUser) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "Welcome, authorized user!".into(),
        userid: user_id,
    })
}
