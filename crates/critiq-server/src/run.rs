use crate::build_state;
use crate::config::ServerConfig;
use crate::error::Result;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::{Router, ServiceExt, response::IntoResponse, routing::get};
use critiq_app::state::AppState;
use critiq_app::{auth::auth_router, rest_api, user::users_router};
use futures::FutureExt;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing::debug;

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if !args.no_cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    // Routes are registered without trailing slashes; clients following
    // the DRF convention send them. Normalize before routing.
    let app = NormalizePathLayer::trim_trailing_slash().layer(app);

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    debug!("Listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

fn main_router(state: AppState) -> Router<()> {
    Router::new()
        .nest("/api/v1/auth", auth_router())
        .nest("/api/v1/users", users_router())
        .nest("/api/v1/categories", rest_api::category::router())
        .nest("/api/v1/genres", rest_api::genre::router())
        .nest("/api/v1/titles", rest_api::title::router())
        .nest(
            "/api/v1/titles/{title_id}/reviews",
            rest_api::review::router(),
        )
        .nest(
            "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
            rest_api::comment::router(),
        )
        .with_state(state)
        .route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
