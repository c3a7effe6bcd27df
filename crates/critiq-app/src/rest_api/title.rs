use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::WithRejection;
use axum_valid::Garde;
use critiq_dal::title::{CreateTitle, TitleFilter, TitleRepository, UpdateTitle};
use critiq_types::{
    claim::ApiClaim,
    policy::{Action, ResourceKind},
    validate,
};
use garde::Validate;
use http::StatusCode;

use crate::{
    auth::claim::authorize,
    error::{ApiError, ApiResult, Checked},
    rest_api::{TITLES_PAGE_SIZE, paginate},
    state::AppState,
};

crate::repository_from_request!(TitleRepository);

#[derive(Debug, Clone, Validate, serde::Deserialize)]
#[garde(allow_unvalidated)]
pub struct TitleListQuery {
    page: Option<u32>,
    #[garde(length(max = 255))]
    category: Option<String>,
    #[garde(length(max = 255))]
    genre: Option<String>,
    #[garde(length(max = 255))]
    name: Option<String>,
    year: Option<i64>,
}

fn check_release_year(year: i64) -> ApiResult<()> {
    let current_year = i64::from(time::OffsetDateTime::now_utc().year());
    validate::check_year(year, current_year).map_err(|e| ApiError::Validation {
        field: "year",
        message: e.to_string(),
    })
}

pub async fn list(
    repository: TitleRepository,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    WithRejection(Garde(Query(query)), _): Checked<Query<TitleListQuery>>,
) -> ApiResult<impl IntoResponse> {
    let page = i64::from(query.page.unwrap_or(1).max(1));
    let params = critiq_dal::ListingParams::new(
        (page - 1) * i64::from(TITLES_PAGE_SIZE),
        i64::from(TITLES_PAGE_SIZE),
    );
    let filter = TitleFilter {
        category: query.category,
        genre: query.genre,
        name: query.name,
        year: query.year,
    };
    let batch = repository.list(filter, params).await?;
    Ok((
        StatusCode::OK,
        Json(paginate(&state, &uri, batch, TITLES_PAGE_SIZE)?),
    ))
}

pub async fn retrieve(
    Path(id): Path<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(id).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn create(
    claim: ApiClaim,
    repository: TitleRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<CreateTitle>>,
) -> ApiResult<impl IntoResponse> {
    authorize(Some(&claim), ResourceKind::Title, Action::Create, None)?;
    check_release_year(payload.year)?;
    let record = repository.create(payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update(
    claim: ApiClaim,
    Path(id): Path<i64>,
    repository: TitleRepository,
    WithRejection(Garde(Json(payload)), _): Checked<Json<UpdateTitle>>,
) -> ApiResult<impl IntoResponse> {
    authorize(Some(&claim), ResourceKind::Title, Action::Update, None)?;
    if let Some(year) = payload.year {
        check_release_year(year)?;
    }
    let record = repository.update(id, payload).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn remove(
    claim: ApiClaim,
    Path(id): Path<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    authorize(Some(&claim), ResourceKind::Title, Action::Delete, None)?;
    repository.delete(id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{title_id}", get(retrieve).patch(update).delete(remove))
}
