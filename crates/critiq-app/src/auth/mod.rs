use axum::{Json, extract::State, response::IntoResponse, routing::post};
use axum_extra::extract::WithRejection;
use axum_valid::Garde;
use critiq_dal::user::UserRepository;
use critiq_types::{claim::ApiClaim, validate};
use garde::Validate;
use http::StatusCode;
use rand::Rng as _;
use serde_json::json;
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult, Checked},
    state::AppState,
};

pub mod claim;

fn valid_username(username: &str, _ctx: &()) -> garde::Result {
    validate::check_username(username).map_err(|e| garde::Error::new(e.to_string()))
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct SignupRequest {
    #[garde(email, length(max = 254))]
    pub email: String,
    #[garde(length(min = 1, max = 150), custom(valid_username))]
    pub username: String,
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct TokenRequest {
    #[garde(length(min = 1, max = 150))]
    pub username: String,
    #[garde(range(min = 0))]
    pub confirmation_code: i64,
}

/// Create or refresh the account and send a fresh confirmation code to
/// the given address. The code never appears in the response.
pub async fn signup(
    State(state): State<AppState>,
    user_registry: UserRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<SignupRequest>>,
) -> ApiResult<impl IntoResponse> {
    let code: i64 = rand::rng().random_range(100_000..=999_999);
    let user = user_registry
        .signup(&payload.email, &payload.username, code)
        .await?;

    state
        .mailer()
        .send_confirmation_code(&user.email, code)
        .map_err(|e| ApiError::Internal(e.into()))?;

    Ok((
        StatusCode::OK,
        Json(json!({"email": user.email, "username": user.username})),
    ))
}

/// Exchange a confirmation code for an access token. A wrong code and an
/// unknown username produce the same not-found answer.
pub async fn token(
    State(state): State<AppState>,
    user_registry: UserRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<TokenRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry
        .find_by_code(&payload.username, payload.confirmation_code)
        .await
        .map_err(|e| {
            debug!("Token exchange failed for {}: {e}", payload.username);
            ApiError::from(e)
        })?;

    let claim = ApiClaim::new_expired(user.id, &user.username, user.role, user.is_superuser);
    let token = state.tokens().issue(claim)?;

    Ok((StatusCode::OK, Json(json!({"token": token}))))
}

/// Builds authentication router - must be nested on the auth path.
pub fn auth_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/signup", post(signup))
        .route("/token", post(token))
}
