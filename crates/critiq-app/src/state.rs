use std::sync::Arc;

use critiq_auth::token::TokenManager;
use critiq_dal::Pool;
use url::Url;

use crate::{error::ApiResult, mail::Mailer};

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(
        app_config: AppConfig,
        pool: Pool,
        tokens: TokenManager,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                pool,
                tokens,
                app_config,
                mailer,
            }),
        }
    }

    pub fn get_app_config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn build_url(&self, relative_url: &str) -> ApiResult<Url> {
        let base = &self.get_app_config().base_url;
        let url = base
            .join(relative_url)
            .map_err(|e| crate::error::ApiError::Internal(e.into()))?;
        Ok(url)
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.state.mailer.as_ref()
    }
}

struct AppStateInner {
    pool: Pool,
    tokens: TokenManager,
    app_config: AppConfig,
    mailer: Arc<dyn Mailer>,
}

pub struct AppConfig {
    pub base_url: Url,
}

// Validated extractors need the unit validation context from state.
impl axum::extract::FromRef<AppState> for () {
    fn from_ref(_: &AppState) {}
}
