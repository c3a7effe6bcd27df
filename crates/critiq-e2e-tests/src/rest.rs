use anyhow::{Result, anyhow};
use reqwest::Url;
use serde_json::json;
use tracing::info;

pub async fn obtain_token(
    client: &reqwest::Client,
    base_url: &Url,
    username: &str,
    confirmation_code: i64,
) -> Result<String> {
    let api_url = base_url.join("api/v1/auth/token").unwrap();
    let response = client
        .post(api_url)
        .json(&json!({"username": username, "confirmation_code": confirmation_code}))
        .send()
        .await?;
    info!("Token response: {:#?}", response);
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await?;
    body.get("token")
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow!("No token in response"))
}

pub async fn create_category(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    slug: &str,
) -> Result<serde_json::Value> {
    let payload = json!({"name": name, "slug": slug});
    let api_url = base_url.join("api/v1/categories/").unwrap();

    let response = client.post(api_url).json(&payload).send().await?;
    assert!(response.status().as_u16() == 201);
    Ok(response.json().await?)
}

pub async fn create_genre(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    slug: &str,
) -> Result<serde_json::Value> {
    let payload = json!({"name": name, "slug": slug});
    let api_url = base_url.join("api/v1/genres/").unwrap();

    let response = client.post(api_url).json(&payload).send().await?;
    assert!(response.status().as_u16() == 201);
    Ok(response.json().await?)
}

pub async fn create_title<T>(
    client: &reqwest::Client,
    base_url: &Url,
    payload: &T,
) -> Result<serde_json::Value>
where
    T: serde::Serialize,
{
    let api_url = base_url.join("api/v1/titles/").unwrap();

    let response = client.post(api_url).json(payload).send().await?;
    info!("Title response: {:#?}", response);
    assert!(response.status().as_u16() == 201);
    Ok(response.json().await?)
}

pub async fn create_review(
    client: &reqwest::Client,
    base_url: &Url,
    title_id: i64,
    text: &str,
    score: i64,
) -> Result<serde_json::Value> {
    let payload = json!({"text": text, "score": score});
    let api_url = base_url
        .join(&format!("api/v1/titles/{title_id}/reviews/"))
        .unwrap();

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Review response: {:#?}", response);
    assert!(response.status().as_u16() == 201);
    Ok(response.json().await?)
}
