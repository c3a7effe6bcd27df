use critiq_e2e_tests::{
    TestUser, launch_env, prepare_env,
    rest::{create_category, create_genre, create_title},
};
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_titles() {
    let (args, _config_guard) = prepare_env("test_titles").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _pool) = launch_env(args, TestUser::Admin).await.unwrap();

    create_category(&client, &base_url, "Movies", "movies")
        .await
        .unwrap();
    create_category(&client, &base_url, "Books", "books")
        .await
        .unwrap();
    create_genre(&client, &base_url, "Drama", "drama").await.unwrap();
    create_genre(&client, &base_url, "Comedy", "comedy")
        .await
        .unwrap();

    let created = create_title(
        &client,
        &base_url,
        &json!({
            "name": "Winter Light",
            "year": 1963,
            "description": "A chamber film",
            "genre": ["drama"],
            "category": "movies"
        }),
    )
    .await
    .unwrap();
    assert_eq!(created["category"]["slug"], "movies");
    assert_eq!(created["genre"][0]["slug"], "drama");
    assert_eq!(created["rating"], serde_json::Value::Null);
    let id = created["id"].as_i64().unwrap();

    create_title(
        &client,
        &base_url,
        &json!({
            "name": "The Trial",
            "year": 1925,
            "genre": ["drama"],
            "category": "books"
        }),
    )
    .await
    .unwrap();

    let api_url = base_url.join("api/v1/titles/").unwrap();

    // Unknown taxonomy slug fails the whole create
    let response = client
        .post(api_url.clone())
        .json(&json!({"name": "Lost", "year": 2004, "genre": ["nope"], "category": "movies"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Future release years are rejected
    let response = client
        .post(api_url.clone())
        .json(&json!({"name": "Prophecy", "year": 3025, "genre": [], "category": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Filters, all usable anonymously
    let anon = reqwest::Client::new();
    let filters = [
        ("category=movies", 1),
        ("genre=drama", 2),
        ("name=light", 1),
        ("year=1925", 1),
        ("genre=drama&category=books", 1),
        ("genre=comedy", 0),
    ];
    for (query, expected) in filters {
        let mut url = api_url.clone();
        url.set_query(Some(query));
        let response = anon.get(url).send().await.unwrap();
        info!("Filter {query} response: {:#?}", response);
        assert!(response.status().is_success());
        let page: serde_json::Value = response.json().await.unwrap();
        assert_eq!(page["count"], expected, "filter {query}");
    }

    // Partial update relinks genres and keeps the rest
    let item_url = base_url.join(&format!("api/v1/titles/{id}")).unwrap();
    let response = client
        .patch(item_url.clone())
        .json(&json!({"genre": ["drama", "comedy"], "description": "Restored cut"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["name"], "Winter Light");
    assert_eq!(updated["description"], "Restored cut");
    assert_eq!(updated["genre"].as_array().unwrap().len(), 2);

    let response = client.delete(item_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let response = anon.get(item_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[traced_test]
async fn test_category_removal_keeps_titles() {
    let (args, _config_guard) = prepare_env("test_category_removal").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _pool) = launch_env(args, TestUser::Admin).await.unwrap();

    create_category(&client, &base_url, "Movies", "movies")
        .await
        .unwrap();
    let created = create_title(
        &client,
        &base_url,
        &json!({"name": "Stalker", "year": 1979, "genre": [], "category": "movies"}),
    )
    .await
    .unwrap();
    let id = created["id"].as_i64().unwrap();

    let response = client
        .delete(base_url.join("api/v1/categories/movies").unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(base_url.join(&format!("api/v1/titles/{id}")).unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let title: serde_json::Value = response.json().await.unwrap();
    assert_eq!(title["category"], serde_json::Value::Null);
}
