use critiq_e2e_tests::{TestUser, launch_env, prepare_env, rest::obtain_token, spawn_server};
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_signup_and_token_flow() {
    let (args, _config_guard) = prepare_env("test_signup").await.unwrap();
    let pool = critiq_dal::new_pool(&args.database_url()).await.unwrap();
    let base_url = args.base_url.clone();
    spawn_server(args).await.unwrap();

    let client = reqwest::Client::new();

    let signup_url = base_url.join("api/v1/auth/signup").unwrap();
    let response = client
        .post(signup_url.clone())
        .json(&json!({"email": "ann@localhost", "username": "ann"}))
        .send()
        .await
        .unwrap();
    info!("Signup response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "ann");
    assert_eq!(body["email"], "ann@localhost");
    // The code travels by mail only, never in the response
    assert!(body.get("confirmation_code").is_none());

    let first_code: i64 =
        sqlx::query_scalar("SELECT confirmation_code FROM users WHERE username = ?")
            .bind("ann")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!((100_000..=999_999).contains(&first_code));

    // Repeated signup with the same pair refreshes the code instead of failing
    let response = client
        .post(signup_url.clone())
        .json(&json!({"email": "ann@localhost", "username": "ann"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // Same username with another email is a validation error on username
    let response = client
        .post(signup_url.clone())
        .json(&json!({"email": "other@localhost", "username": "ann"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body.get("username").is_some());

    // Taken email with a fresh username points at the email field
    let response = client
        .post(signup_url.clone())
        .json(&json!({"email": "ann@localhost", "username": "annie"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body.get("email").is_some());

    // Reserved username is rejected
    let response = client
        .post(signup_url)
        .json(&json!({"email": "me@localhost", "username": "me"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let code: i64 = sqlx::query_scalar("SELECT confirmation_code FROM users WHERE username = ?")
        .bind("ann")
        .fetch_one(&pool)
        .await
        .unwrap();

    // A wrong code is indistinguishable from an unknown username
    let token_url = base_url.join("api/v1/auth/token").unwrap();
    let response = client
        .post(token_url.clone())
        .json(&json!({"username": "ann", "confirmation_code": code + 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .post(token_url)
        .json(&json!({"username": "nobody", "confirmation_code": code}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let token = obtain_token(&client, &base_url, "ann", code).await.unwrap();

    let me_url = base_url.join("api/v1/users/me").unwrap();
    let response = client
        .get(me_url)
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    info!("Me response: {:#?}", response);
    assert!(response.status().is_success());
    let me: serde_json::Value = response.json().await.unwrap();
    assert_eq!(me["username"], "ann");
    assert_eq!(me["role"], "user");
}

#[tokio::test]
#[traced_test]
async fn test_self_update_keeps_role() {
    let (args, _config_guard) = prepare_env("test_self_update").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _pool) = launch_env(args, TestUser::User).await.unwrap();

    let me_url = base_url.join("api/v1/users/me").unwrap();
    let response = client
        .patch(me_url.clone())
        .json(&json!({"bio": "I write reviews", "role": "admin"}))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    let me: serde_json::Value = response.json().await.unwrap();
    assert_eq!(me["bio"], "I write reviews");
    // The role field is silently pinned on the self-service path
    assert_eq!(me["role"], "user");

    // An explicit null clears the field, an absent one keeps it
    let response = client
        .patch(me_url.clone())
        .json(&json!({"first_name": "Joe"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let response = client
        .patch(me_url.clone())
        .json(&json!({"bio": null}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let me: serde_json::Value = response.json().await.unwrap();
    assert_eq!(me["bio"], serde_json::Value::Null);
    assert_eq!(me["first_name"], "Joe");

    // A plain user cannot touch the admin user listing
    let users_url = base_url.join("api/v1/users/").unwrap();
    let response = client.get(users_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
#[traced_test]
async fn test_admin_user_management() {
    let (args, _config_guard) = prepare_env("test_admin_users").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _pool) = launch_env(args, TestUser::Admin).await.unwrap();

    let users_url = base_url.join("api/v1/users/").unwrap();
    let response = client
        .post(users_url.clone())
        .json(&json!({
            "username": "newbie",
            "email": "newbie@localhost",
            "first_name": "New",
            "last_name": "Bee",
            "bio": null,
            "role": "moderator"
        }))
        .send()
        .await
        .unwrap();
    info!("Create response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 201);
    let created: serde_json::Value = response.json().await.unwrap();
    assert_eq!(created["role"], "moderator");

    let response = client.get(users_url.clone()).send().await.unwrap();
    assert!(response.status().is_success());
    let page: serde_json::Value = response.json().await.unwrap();
    assert_eq!(page["count"], 2);

    let user_url = base_url.join("api/v1/users/newbie").unwrap();
    let response = client
        .patch(user_url.clone())
        .json(&json!({"role": "user"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["role"], "user");

    let response = client.delete(user_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client.get(user_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
