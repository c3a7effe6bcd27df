use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::WithRejection;
use axum_valid::Garde;
use critiq_dal::comment::{CommentRepository, CreateComment, UpdateComment};
use critiq_types::{
    claim::ApiClaim,
    policy::{Action, ResourceKind},
};
use http::StatusCode;

use crate::{
    auth::claim::authorize,
    error::{ApiError, ApiResult, Checked},
    rest_api::{COMMENTS_PAGE_SIZE, Paging, paginate},
    state::AppState,
};

crate::repository_from_request!(CommentRepository);

// Comments resolve their review by review_id alone; the title_id path
// segment is not cross-checked against the review.

pub async fn list(
    Path((_title_id, review_id)): Path<(i64, i64)>,
    repository: CommentRepository,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    WithRejection(Garde(Query(paging)), _): Checked<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    repository.review_exists(review_id).await?;
    let params = paging.listing_params(COMMENTS_PAGE_SIZE);
    let batch = repository.list_for_review(review_id, params).await?;
    Ok((
        StatusCode::OK,
        Json(paginate(&state, &uri, batch, COMMENTS_PAGE_SIZE)?),
    ))
}

pub async fn retrieve(
    Path((_title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get_for_review(review_id, comment_id).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn create(
    claim: ApiClaim,
    Path((_title_id, review_id)): Path<(i64, i64)>,
    repository: CommentRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<CreateComment>>,
) -> ApiResult<impl IntoResponse> {
    let principal = authorize(Some(&claim), ResourceKind::Comment, Action::Create, None)?
        .ok_or(ApiError::Unauthorized)?;
    let record = repository.create(review_id, principal.id, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update(
    claim: ApiClaim,
    Path((_title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<UpdateComment>>,
) -> ApiResult<impl IntoResponse> {
    let current = repository.get_for_review(review_id, comment_id).await?;
    authorize(
        Some(&claim),
        ResourceKind::Comment,
        Action::Update,
        Some(current.author_id),
    )?;
    let record = repository.update(review_id, comment_id, payload).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn remove(
    claim: ApiClaim,
    Path((_title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    let current = repository.get_for_review(review_id, comment_id).await?;
    authorize(
        Some(&claim),
        ResourceKind::Comment,
        Action::Delete,
        Some(current.author_id),
    )?;
    repository.delete(review_id, comment_id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{comment_id}", get(retrieve).patch(update).delete(remove))
}
