use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get},
};
use axum_extra::extract::WithRejection;
use axum_valid::Garde;
use critiq_dal::category::{CategoryRepository, CreateCategory};
use critiq_types::{
    claim::ApiClaim,
    policy::{Action, ResourceKind},
};
use http::StatusCode;

use crate::{
    auth::claim::authorize,
    error::{ApiResult, Checked},
    rest_api::{Paging, TITLES_PAGE_SIZE, paginate},
    state::AppState,
};

crate::repository_from_request!(CategoryRepository);

pub async fn list(
    repository: CategoryRepository,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    WithRejection(Garde(Query(paging)), _): Checked<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let params = paging.listing_params(TITLES_PAGE_SIZE);
    let batch = repository.list(paging.search.as_deref(), params).await?;
    Ok((
        StatusCode::OK,
        Json(paginate(&state, &uri, batch, TITLES_PAGE_SIZE)?),
    ))
}

pub async fn create(
    claim: ApiClaim,
    repository: CategoryRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<CreateCategory>>,
) -> ApiResult<impl IntoResponse> {
    authorize(Some(&claim), ResourceKind::Category, Action::Create, None)?;
    let record = repository.create(payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn remove(
    claim: ApiClaim,
    Path(slug): Path<String>,
    repository: CategoryRepository,
) -> ApiResult<impl IntoResponse> {
    authorize(Some(&claim), ResourceKind::Category, Action::Delete, None)?;
    repository.delete_by_slug(&slug).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{slug}", delete(remove))
}
