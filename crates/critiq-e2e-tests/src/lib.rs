pub mod rest;

use anyhow::{Context as _, Result, anyhow};
use critiq_server::config::{Parser, ServerConfig};
use critiq_types::claim::Role;
use rand::Rng as _;
use tempfile::TempDir;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "critiq-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Test config plus a migrated database, so tests can seed rows before the
/// server starts.
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let (config, guard) = test_config(test_name)?;
    let pool = critiq_dal::new_pool(&config.database_url()).await?;
    critiq_dal::migrate(&pool).await?;
    Ok((config, guard))
}

pub async fn spawn_server(args: ServerConfig) -> Result<()> {
    let base_url = args.base_url.clone();
    let state = critiq_server::build_state(&args).await?;
    tokio::spawn(critiq_server::run::run_graceful_with_state(
        args,
        state,
        std::future::pending::<()>(),
    ));

    let client = reqwest::Client::new();
    let health_url = base_url.join("health")?;
    for _ in 0..50 {
        if let Ok(resp) = client.get(health_url.clone()).send().await {
            if resp.status().is_success() {
                return Ok(());
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not become healthy"))
}

#[derive(Debug, Clone, Copy)]
pub enum TestUser {
    Admin,
    Moderator,
    User,
}

impl TestUser {
    pub fn username(&self) -> &'static str {
        match self {
            TestUser::Admin => "boss",
            TestUser::Moderator => "referee",
            TestUser::User => "joe",
        }
    }

    fn role(&self) -> Role {
        match self {
            TestUser::Admin => Role::Admin,
            TestUser::Moderator => Role::Moderator,
            TestUser::User => Role::User,
        }
    }
}

const TEST_CODE: i64 = 424_242;

/// Inserts the given user directly, starts the server and exchanges the
/// confirmation code for a token. Returns a client sending that token with
/// every request, plus a pool on the same database for extra seeding.
pub async fn launch_env(
    args: ServerConfig,
    user: TestUser,
) -> Result<(reqwest::Client, critiq_dal::Pool)> {
    let pool = critiq_dal::new_pool(&args.database_url()).await?;
    let username = user.username();
    sqlx::query(
        "INSERT INTO users (username, email, role, confirmation_code) VALUES (?, ?, ?, ?)",
    )
    .bind(username)
    .bind(format!("{username}@localhost"))
    .bind(user.role().as_str())
    .bind(TEST_CODE)
    .execute(&pool)
    .await?;

    let base_url = args.base_url.clone();
    spawn_server(args).await?;

    let token = rest::obtain_token(&reqwest::Client::new(), &base_url, username, TEST_CODE).await?;

    let mut headers = reqwest::header::HeaderMap::new();
    let mut auth_value: reqwest::header::HeaderValue =
        format!("Bearer {token}").parse().context("header value")?;
    auth_value.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, auth_value);
    let client = reqwest::Client::builder().default_headers(headers).build()?;
    Ok((client, pool))
}
