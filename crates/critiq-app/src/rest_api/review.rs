use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::WithRejection;
use axum_valid::Garde;
use critiq_dal::{
    review::{CreateReview, ReviewRepository, UpdateReview},
    title::TitleRepository,
};
use critiq_types::{
    claim::ApiClaim,
    policy::{Action, ResourceKind},
};
use http::StatusCode;

use crate::{
    auth::claim::authorize,
    error::{ApiError, ApiResult, Checked},
    rest_api::{Paging, REVIEWS_PAGE_SIZE, paginate},
    state::AppState,
};

crate::repository_from_request!(ReviewRepository);

pub async fn list(
    Path(title_id): Path<i64>,
    titles: TitleRepository,
    repository: ReviewRepository,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    WithRejection(Garde(Query(paging)), _): Checked<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    titles.exists(title_id).await?;
    let params = paging.listing_params(REVIEWS_PAGE_SIZE);
    let batch = repository.list_for_title(title_id, params).await?;
    Ok((
        StatusCode::OK,
        Json(paginate(&state, &uri, batch, REVIEWS_PAGE_SIZE)?),
    ))
}

pub async fn retrieve(
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get_for_title(title_id, review_id).await?;
    Ok((StatusCode::OK, Json(record)))
}

/// The author is always the authenticated caller - authorship cannot be
/// spoofed through the payload.
pub async fn create(
    claim: ApiClaim,
    Path(title_id): Path<i64>,
    titles: TitleRepository,
    repository: ReviewRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    let principal = authorize(Some(&claim), ResourceKind::Review, Action::Create, None)?
        .ok_or(ApiError::Unauthorized)?;
    titles.exists(title_id).await?;
    let record = repository.create(title_id, principal.id, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update(
    claim: ApiClaim,
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: ReviewRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<UpdateReview>>,
) -> ApiResult<impl IntoResponse> {
    let current = repository.get_for_title(title_id, review_id).await?;
    authorize(
        Some(&claim),
        ResourceKind::Review,
        Action::Update,
        Some(current.author_id),
    )?;
    let record = repository.update(title_id, review_id, payload).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn remove(
    claim: ApiClaim,
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let current = repository.get_for_title(title_id, review_id).await?;
    authorize(
        Some(&claim),
        ResourceKind::Review,
        Action::Delete,
        Some(current.author_id),
    )?;
    repository.delete(title_id, review_id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{review_id}", get(retrieve).patch(update).delete(remove))
}
