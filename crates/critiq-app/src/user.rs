use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::WithRejection;
use axum_valid::Garde;
use critiq_dal::user::{CreateUser, UpdateUser, UserRepository};
use critiq_types::{
    claim::ApiClaim,
    policy::{Action, ResourceKind},
};
use http::StatusCode;

use crate::{
    auth::claim::{authorize, principal},
    error::{ApiResult, Checked},
    rest_api::{Paging, TITLES_PAGE_SIZE, paginate},
    state::AppState,
};

crate::repository_from_request!(UserRepository);

pub async fn list_users(
    claim: ApiClaim,
    user_registry: UserRepository,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    WithRejection(Garde(Query(paging)), _): Checked<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    authorize(Some(&claim), ResourceKind::User, Action::List, None)?;
    let batch = user_registry
        .list(paging.listing_params(TITLES_PAGE_SIZE))
        .await?;
    Ok((
        StatusCode::OK,
        Json(paginate(&state, &uri, batch, TITLES_PAGE_SIZE)?),
    ))
}

pub async fn create_user(
    claim: ApiClaim,
    user_registry: UserRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    authorize(Some(&claim), ResourceKind::User, Action::Create, None)?;
    let user = user_registry.create(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    claim: ApiClaim,
    Path(username): Path<String>,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    authorize(Some(&claim), ResourceKind::User, Action::Retrieve, None)?;
    let user = user_registry.get_by_username(&username).await?;
    Ok((StatusCode::OK, Json(user)))
}

pub async fn update_user(
    claim: ApiClaim,
    Path(username): Path<String>,
    user_registry: UserRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<UpdateUser>>,
) -> ApiResult<impl IntoResponse> {
    authorize(Some(&claim), ResourceKind::User, Action::Update, None)?;
    let user = user_registry.update_by_username(&username, payload).await?;
    Ok((StatusCode::OK, Json(user)))
}

pub async fn delete_user(
    claim: ApiClaim,
    Path(username): Path<String>,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    authorize(Some(&claim), ResourceKind::User, Action::Delete, None)?;
    user_registry.delete_by_username(&username).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

/// Own record, for any authenticated caller.
pub async fn get_me(
    claim: ApiClaim,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let me = principal(&claim)?;
    let user = user_registry.get(me.id).await?;
    Ok((StatusCode::OK, Json(user)))
}

/// Self update. A submitted role value is ignored - the stored role is
/// written back regardless.
pub async fn update_me(
    claim: ApiClaim,
    user_registry: UserRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<UpdateUser>>,
) -> ApiResult<impl IntoResponse> {
    let me = principal(&claim)?;
    let user = user_registry.update_self(me.id, payload).await?;
    Ok((StatusCode::OK, Json(user)))
}

pub fn users_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(get_me).patch(update_me))
        .route(
            "/{username}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}
