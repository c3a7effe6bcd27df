use axum::{RequestPartsExt, extract::FromRequestParts};
use axum_extra::TypedHeader;
use critiq_types::{
    claim::ApiClaim,
    policy::{Access, Action, Principal, ResourceKind, allowed},
};
use headers::{Authorization, authorization::Bearer};
use http::request::Parts;
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

impl FromRequestParts<AppState> for ApiClaim {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::Unauthorized)?;
        validate_token(state, bearer.token())
    }
}

fn validate_token(state: &AppState, token: &str) -> ApiResult<ApiClaim> {
    state.tokens().validate::<ApiClaim>(token).map_err(|e| {
        debug!("Failed to validate token: {e}");
        ApiError::Unauthorized
    })
}

pub fn principal(claim: &ApiClaim) -> ApiResult<Principal> {
    claim
        .user_id()
        .map(|id| Principal::new(id, claim.role, claim.superuser))
        .ok_or(ApiError::Unauthorized)
}

/// Run the policy table and translate its verdict to an API error.
/// Returns the principal so handlers can attach authorship.
pub fn authorize(
    claim: Option<&ApiClaim>,
    resource: ResourceKind,
    action: Action,
    owner: Option<i64>,
) -> ApiResult<Option<Principal>> {
    let principal = claim.map(principal).transpose()?;
    match allowed(principal.as_ref(), resource, action, owner) {
        Access::Granted => Ok(principal),
        Access::Unauthorized => Err(ApiError::Unauthorized),
        Access::Forbidden => Err(ApiError::Forbidden),
    }
}
