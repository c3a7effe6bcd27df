pub mod config;
pub mod error;
pub mod run;

use std::{path::Path, sync::Arc};

use config::ServerConfig;
pub use error::{Error, Result};
use critiq_app::{
    mail::LogMailer,
    state::{AppConfig, AppState},
};
use tokio::{fs, io::AsyncWriteExt as _};

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let app_config = AppConfig {
        base_url: config.base_url.clone(),
    };

    let pool = critiq_dal::new_pool(&config.database_url()).await?;
    critiq_dal::migrate(&pool).await?;

    let data_dir = config.data_dir();
    let secret = read_secret(&data_dir).await?;
    let tokens = critiq_auth::token::TokenManager::new(&secret, config.token_validity);
    Ok(AppState::new(app_config, pool, tokens, Arc::new(LogMailer)))
}

async fn read_secret(data_dir: &Path) -> Result<Vec<u8>, std::io::Error> {
    let secret_file = data_dir.join("secret");

    let secret = if fs::try_exists(&secret_file).await? {
        fs::read(&secret_file).await?
    } else {
        let random_bytes = rand::random::<[u8; 32]>();
        #[cfg(unix)]
        let mut file = {
            use std::fs::OpenOptions;
            use std::os::unix::fs::OpenOptionsExt;
            {
                // Make sure the file is only accessible by the current user
                let _f = OpenOptions::new()
                    .mode(0o600)
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&secret_file)?;
            }
            fs::File::options().write(true).open(&secret_file).await?
        };
        #[cfg(not(unix))]
        let mut file = fs::File::create(&secret_file).await?;

        file.write_all(&random_bytes).await?;
        random_bytes.as_ref().to_vec()
    };
    Ok(secret)
}
