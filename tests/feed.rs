mod support;

use axum::http::StatusCode;

use support::{TestApp, position};

async fn seeded_group_feed(app: &TestApp) {
    let author = app.store.add_user("testUser").await;
    let group = app
        .store
        .add_group("Test group", "test-slug", "Posts for pagination")
        .await;
    for n in 1..=13 {
        app.store
            .add_post_at(&author, Some(&group), &format!("entry-{n:02}"), n)
            .await;
    }
}

#[tokio::test]
async fn index_lists_newest_first_with_id_tie_break() {
    let app = TestApp::new();
    let author = app.store.add_user("writer").await;
    app.store.add_post_at(&author, None, "entry-old", 0).await;
    app.store.add_post_at(&author, None, "entry-tie-low", 5).await;
    app.store.add_post_at(&author, None, "entry-tie-high", 5).await;

    let response = app.get("/", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.text();
    assert!(position(&body, "entry-tie-high") < position(&body, "entry-tie-low"));
    assert!(position(&body, "entry-tie-low") < position(&body, "entry-old"));
}

#[tokio::test]
async fn group_feed_splits_thirteen_posts_into_ten_and_three() {
    let app = TestApp::new();
    seeded_group_feed(&app).await;

    let first = app.get("/group/test-slug/", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.post_cards(), 10);
    let body = first.text();
    assert!(body.contains("entry-13"));
    assert!(body.contains("entry-04"));
    assert!(!body.contains("entry-03"));

    let second = app.get("/group/test-slug/?page=2", None).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.post_cards(), 3);
    let body = second.text();
    assert!(body.contains("entry-03"));
    assert!(body.contains("entry-01"));
}

#[tokio::test]
async fn profile_paginates_the_same_way() {
    let app = TestApp::new();
    seeded_group_feed(&app).await;

    let first = app.get("/profile/testUser/", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.post_cards(), 10);
    assert!(first.text().contains("Posts: 13"));

    let second = app.get("/profile/testUser/?page=2", None).await;
    assert_eq!(second.post_cards(), 3);
}

#[tokio::test]
async fn unusable_page_numbers_are_clamped() {
    let app = TestApp::new();
    seeded_group_feed(&app).await;

    for query in ["page=abc", "page=0", "page=-1", "page="] {
        let response = app.get(&format!("/group/test-slug/?{query}"), None).await;
        assert_eq!(response.status, StatusCode::OK, "query {query}");
        assert_eq!(response.post_cards(), 10, "query {query}");
        assert!(response.text().contains("entry-13"), "query {query}");
    }

    for query in ["page=99", "page=99999999999999999999999"] {
        let response = app.get(&format!("/group/test-slug/?{query}"), None).await;
        assert_eq!(response.status, StatusCode::OK, "query {query}");
        assert_eq!(response.post_cards(), 3, "query {query}");
        assert!(response.text().contains("entry-01"), "query {query}");
    }
}

#[tokio::test]
async fn empty_feed_renders_a_single_page() {
    let app = TestApp::new();

    let response = app.get("/?page=5", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.post_cards(), 0);
    assert!(response.text().contains("No posts yet."));
}

#[tokio::test]
async fn group_feed_only_shows_its_own_posts() {
    let app = TestApp::new();
    let author = app.store.add_user("writer").await;
    let cats = app.store.add_group("Cats", "cats", "").await;
    let dogs = app.store.add_group("Dogs", "dogs", "").await;
    app.store.add_post_at(&author, Some(&cats), "entry-cat", 1).await;
    app.store.add_post_at(&author, Some(&dogs), "entry-dog", 2).await;
    app.store.add_post_at(&author, None, "entry-loose", 3).await;

    let body = app.get("/group/cats/", None).await.text();
    assert!(body.contains("entry-cat"));
    assert!(!body.contains("entry-dog"));
    assert!(!body.contains("entry-loose"));
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let app = TestApp::new();
    let author = app.store.add_user("writer").await;
    app.store.add_post_at(&author, None, "entry-01", 1).await;

    for path in [
        "/group/missing/",
        "/profile/nobody/",
        "/posts/999/",
        "/posts/abc/",
        "/no/such/page/",
    ] {
        let response = app.get(path, None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "path {path}");
    }
}

#[tokio::test]
async fn profile_lookup_is_case_sensitive() {
    let app = TestApp::new();
    app.store.add_user("testUser").await;

    assert_eq!(app.get("/profile/testUser/", None).await.status, StatusCode::OK);
    assert_eq!(
        app.get("/profile/testuser/", None).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn post_detail_shows_author_count_and_comments() {
    let app = TestApp::new();
    let author = app.store.add_user("writer").await;
    let first = app.store.add_post_at(&author, None, "entry-01", 1).await;
    app.store.add_post_at(&author, None, "entry-02", 2).await;

    let response = app.get(&format!("/posts/{first}/"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.text();
    assert!(body.contains("entry-01"));
    assert!(body.contains("Posts by this author: 2"));
    assert!(!body.contains("Add a comment"));
    assert!(!body.contains("Edit post"));

    let as_author = app.get(&format!("/posts/{first}/"), Some("writer")).await.text();
    assert!(as_author.contains("Add a comment"));
    assert!(as_author.contains("Edit post"));
}

#[tokio::test]
async fn follow_index_requires_sign_in() {
    let app = TestApp::new();

    let response = app.get("/follow/", None).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/auth/login/?next=%2Ffollow%2F"));
}

#[tokio::test]
async fn follow_index_lists_only_followed_authors() {
    let app = TestApp::new();
    let reader = app.store.add_user("reader").await;
    let followed = app.store.add_user("followed").await;
    let stranger = app.store.add_user("stranger").await;
    app.store.add_follow(&reader, &followed).await;
    app.store.add_post_at(&followed, None, "entry-followed", 1).await;
    app.store.add_post_at(&stranger, None, "entry-stranger", 2).await;

    let response = app.get("/follow/", Some("reader")).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.text();
    assert!(body.contains("entry-followed"));
    assert!(!body.contains("entry-stranger"));

    let other = app.get("/follow/", Some("stranger")).await;
    assert_eq!(other.post_cards(), 0);
}

#[tokio::test]
async fn every_response_carries_a_fresh_request_id() {
    let app = TestApp::new();

    let first = app.get("/", Some("writer")).await;
    let missing = app.get("/group/absent/", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let id_of = |response: &support::TestResponse| {
        response
            .headers
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .expect("request id header")
    };
    assert_ne!(id_of(&first), id_of(&missing));
}
