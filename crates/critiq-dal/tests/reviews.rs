use critiq_dal::{
    Error, ListingParams,
    comment::{CommentRepositoryImpl, CreateComment},
    review::{CreateReview, ReviewRepositoryImpl, UpdateReview},
    title::TitleRepositoryImpl,
};
use sqlx::Executor;

const TEST_DATA: &str = r#"
INSERT INTO users (id, username, email, role) VALUES (1, 'ann', 'ann@example.com', 'user');
INSERT INTO users (id, username, email, role) VALUES (2, 'bob', 'bob@example.com', 'user');

INSERT INTO category (id, name, slug) VALUES (1, 'Books', 'books');

INSERT INTO genre (id, name, slug) VALUES (1, 'Crime', 'crime');
INSERT INTO genre (id, name, slug) VALUES (2, 'Sci-Fi', 'sci-fi');

INSERT INTO title (id, name, year, description, category_id) VALUES (1, 'Dune', 1965, 'Desert planet', 1);
INSERT INTO title (id, name, year, description, category_id) VALUES (2, 'Empty', 1999, NULL, NULL);

INSERT INTO title_genres (title_id, genre_id) VALUES (1, 2);
"#;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(DB_URL)
        .await
        .unwrap();
    conn.execute("PRAGMA foreign_keys = ON").await.unwrap();
    sqlx::migrate!("../../migrations").run(&conn).await.unwrap();

    sqlx::raw_sql(TEST_DATA).execute(&conn).await.unwrap();

    conn
}

#[tokio::test]
async fn test_rating_is_mean_of_scores() {
    let conn = init_db().await;
    let titles = TitleRepositoryImpl::new(conn.clone());
    let reviews = ReviewRepositoryImpl::new(conn);

    let title = titles.get(1).await.unwrap();
    assert!(title.rating.is_none());

    reviews
        .create(
            1,
            1,
            CreateReview {
                text: "Classic".to_string(),
                score: 7,
            },
        )
        .await
        .unwrap();
    let title = titles.get(1).await.unwrap();
    assert_eq!(title.rating, Some(7.0));

    reviews
        .create(
            1,
            2,
            CreateReview {
                text: "Great".to_string(),
                score: 10,
            },
        )
        .await
        .unwrap();
    let title = titles.get(1).await.unwrap();
    assert_eq!(title.rating, Some(8.5));

    // other title untouched
    let other = titles.get(2).await.unwrap();
    assert!(other.rating.is_none());
}

#[tokio::test]
async fn test_one_review_per_author_and_title() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn.clone());

    reviews
        .create(
            1,
            1,
            CreateReview {
                text: "First".to_string(),
                score: 5,
            },
        )
        .await
        .unwrap();

    let err = reviews
        .create(
            1,
            1,
            CreateReview {
                text: "Second".to_string(),
                score: 6,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::DuplicateReview {
            title_id: 1,
            author_id: 1
        }
    ));

    // the constraint is the last line of defense when the pre-check is
    // bypassed
    let err = sqlx::query("INSERT INTO review (title_id, author_id, text, score) VALUES (1, 1, 'x', 3)")
        .execute(&conn)
        .await
        .map_err(Error::from)
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // same author may review another title
    reviews
        .create(
            2,
            1,
            CreateReview {
                text: "Another".to_string(),
                score: 8,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_review_scoped_by_parent_title() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn);

    let review = reviews
        .create(
            1,
            1,
            CreateReview {
                text: "Scoped".to_string(),
                score: 9,
            },
        )
        .await
        .unwrap();
    assert_eq!(review.author, "ann");

    assert!(reviews.get_for_title(1, review.id).await.is_ok());
    let err = reviews.get_for_title(2, review.id).await.unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

#[tokio::test]
async fn test_review_update_keeps_pub_date() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn);

    let review = reviews
        .create(
            1,
            1,
            CreateReview {
                text: "Before".to_string(),
                score: 4,
            },
        )
        .await
        .unwrap();

    let updated = reviews
        .update(
            1,
            review.id,
            UpdateReview {
                text: Some("After".to_string()),
                score: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.text, "After");
    assert_eq!(updated.score, 4);
    assert_eq!(updated.pub_date, review.pub_date);
}

#[tokio::test]
async fn test_comments_follow_review_lifecycle() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn.clone());
    let comments = CommentRepositoryImpl::new(conn.clone());
    let titles = TitleRepositoryImpl::new(conn.clone());

    let review = reviews
        .create(
            1,
            1,
            CreateReview {
                text: "Reviewed".to_string(),
                score: 6,
            },
        )
        .await
        .unwrap();

    let comment = comments
        .create(
            review.id,
            2,
            CreateComment {
                text: "I agree".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(comment.author, "bob");

    let listed = comments
        .list_for_review(review.id, ListingParams::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);

    // unknown review is a missing parent
    let err = comments
        .create(
            999,
            2,
            CreateComment {
                text: "Orphan".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));

    // deleting the title cascades through reviews to comments
    titles.delete(1).await.unwrap();
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comment")
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(count, 0);
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM review")
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
