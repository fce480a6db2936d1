use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{
            ErrorResponse, LoginRequest, MessageResponse, OtpRequest, TokenResponse,
            VerifyOtpRequest,
        },
        error::AuthError,
        extractors::AuthUser,
        repo_types::{PublicUser, RegistrationInput},
        services::{is_valid_email, within},
    },
    state::AppState,
};

type Rejection = (StatusCode, Json<ErrorResponse>);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/sendotp", post(send_otp))
        .route("/auth/verifyotp", post(verify_otp))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

fn reject(e: AuthError) -> Rejection {
    let status = e.status();
    if status.is_server_error() {
        error!(error = %e, %status, "auth request failed");
    }
    (
        status,
        Json(ErrorResponse {
            status: "failed",
            error: e.public_message(),
        }),
    )
}

fn normalize_email(email: &str) -> Result<String, Rejection> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(reject(AuthError::Validation("invalid email".into())));
    }
    Ok(email)
}

fn token_response(token: String, message: Option<&'static str>) -> Json<TokenResponse> {
    Json(TokenResponse {
        status: "success",
        message,
        token,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegistrationInput>,
) -> Result<Json<TokenResponse>, Rejection> {
    // Phone-only accounts register without an email and log in through otp.
    payload.email = if payload.email.trim().is_empty() {
        String::new()
    } else {
        normalize_email(&payload.email)?
    };

    let token = within(state.config.request_timeout(), state.auth.sign_up(payload))
        .await
        .map_err(reject)?;
    Ok(token_response(token, None))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, Rejection> {
    let email = normalize_email(&payload.email)?;

    let token = within(
        state.config.request_timeout(),
        state.auth.login(&email, &payload.password),
    )
    .await
    .map_err(reject)?;
    Ok(token_response(token, None))
}

#[instrument(skip(state, payload))]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), Rejection> {
    let phone = payload.phone_number.trim();
    if phone.is_empty() {
        return Err(reject(AuthError::Validation("phoneNumber is required".into())));
    }

    within(
        state.config.request_timeout(),
        state.auth.send_otp(phone, state.otp.as_ref()),
    )
    .await
    .map_err(reject)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            status: "success",
            message: "OTP sent successfully",
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<TokenResponse>, Rejection> {
    let phone = payload.user.phone_number.trim();
    if phone.is_empty() || payload.code.is_empty() {
        return Err(reject(AuthError::Validation(
            "phoneNumber and code are required".into(),
        )));
    }

    let token = within(
        state.config.request_timeout(),
        state
            .auth
            .login_phone_otp(phone, &payload.code, state.otp.as_ref()),
    )
    .await
    .map_err(reject)?;
    Ok(token_response(token, Some("OTP verified successfully")))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, Rejection> {
    let user = within(state.config.request_timeout(), state.auth.profile(user_id))
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "profile lookup failed");
            reject(e)
        })?;
    Ok(Json(user.into()))
}
