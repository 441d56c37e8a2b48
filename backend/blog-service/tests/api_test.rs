use actix_web::http::StatusCode;
use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::{test, web, App};
use blog_service::db::MemoryStore;
use blog_service::handlers;
use blog_service::middleware::{Claims, IdentityMiddleware, JwtValidator};
use blog_service::models::User;
use blog_service::AppState;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

const SECRET: &[u8] = b"test-secret";

macro_rules! test_app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new($store.clone())))
                .wrap(IdentityMiddleware::new(JwtValidator::hs256(SECRET, 0)))
                .configure(handlers::configure),
        )
        .await
    };
}

fn bearer(user: &User) -> (&'static str, String) {
    token_for(user.id, &user.username)
}

fn token_for(id: Uuid, username: &str) -> (&'static str, String) {
    let claims = Claims {
        sub: id.to_string(),
        username: username.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET))
        .expect("encode token");
    ("Authorization", format!("Bearer {}", token))
}

async fn users(store: &MemoryStore) -> (User, User) {
    (store.insert_user("u1").await, store.insert_user("u2").await)
}

#[actix_web::test]
async fn post_delete_scenario() {
    let store = Arc::new(MemoryStore::new());
    let (u1, u2) = users(&store).await;
    let app = test_app!(store);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/posts/")
            .insert_header(bearer(&u1))
            .set_json(json!({ "text": "hello" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Value = test::read_body_json(resp).await;
    assert_eq!(post["author"], "u1");
    assert_eq!(post["text"], "hello");
    let post_id = post["id"].as_i64().expect("id assigned");
    let post_uri = format!("/api/v1/posts/{}/", post_id);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&post_uri)
            .insert_header(bearer(&u2))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&post_uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let still_there: Value = test::read_body_json(resp).await;
    assert_eq!(still_there["text"], "hello");

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&post_uri)
            .insert_header(bearer(&u1))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&post_uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn follow_scenario() {
    let store = Arc::new(MemoryStore::new());
    let (u1, _u2) = users(&store).await;
    let app = test_app!(store);

    let follow = |username: &str| {
        test::TestRequest::post()
            .uri("/api/v1/follow/")
            .insert_header(bearer(&u1))
            .set_json(json!({ "following": username }))
            .to_request()
    };

    let resp = test::call_service(&app, follow("u1")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "self-follow");

    let resp = test::call_service(&app, follow("u2")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"], "u1");
    assert_eq!(body["following"], "u2");

    let resp = test::call_service(&app, follow("u2")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "duplicate-follow");

    let resp = test::call_service(&app, follow("nobody")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn client_supplied_owner_fields_are_ignored() {
    let store = Arc::new(MemoryStore::new());
    let (u1, u2) = users(&store).await;
    let app = test_app!(store);

    let post: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/posts/")
            .insert_header(bearer(&u1))
            .set_json(json!({ "text": "mine", "author": "u2" }))
            .to_request(),
    )
    .await;
    assert_eq!(post["author"], "u1");

    let other: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/posts/")
            .insert_header(bearer(&u2))
            .set_json(json!({ "text": "theirs" }))
            .to_request(),
    )
    .await;

    let comment: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/posts/{}/comments/", post["id"]))
            .insert_header(bearer(&u2))
            .set_json(json!({ "text": "hi", "post": other["id"], "author": "u1" }))
            .to_request(),
    )
    .await;
    assert_eq!(comment["post"], post["id"]);
    assert_eq!(comment["author"], "u2");

    let follow: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/follow/")
            .insert_header(bearer(&u2))
            .set_json(json!({ "following": "u1", "user": "u1" }))
            .to_request(),
    )
    .await;
    assert_eq!(follow["user"], "u2");
}

#[actix_web::test]
async fn comments_never_leak_across_posts() {
    let store = Arc::new(MemoryStore::new());
    let (u1, _u2) = users(&store).await;
    let app = test_app!(store);

    let mut post_ids = Vec::new();
    for text in ["A", "B"] {
        let post: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/posts/")
                .insert_header(bearer(&u1))
                .set_json(json!({ "text": text }))
                .to_request(),
        )
        .await;
        post_ids.push(post["id"].as_i64().unwrap());
    }
    let (a, b) = (post_ids[0], post_ids[1]);

    let on_b: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/posts/{}/comments/", b))
            .insert_header(bearer(&u1))
            .set_json(json!({ "text": "on B" }))
            .to_request(),
    )
    .await;

    let listed: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/posts/{}/comments/", a))
            .to_request(),
    )
    .await;
    assert_eq!(listed, json!([]));

    let cross_uri = format!("/api/v1/posts/{}/comments/{}/", a, on_b["id"]);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&cross_uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&cross_uri)
            .insert_header(bearer(&u1))
            .set_json(json!({ "text": "hijack" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/posts/999/comments/")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn anonymous_callers_read_but_never_write() {
    let store = Arc::new(MemoryStore::new());
    let (u1, _u2) = users(&store).await;
    store.insert_group("Cats", "cats", "All about cats").await;
    let app = test_app!(store);

    let post: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/posts/")
            .insert_header(bearer(&u1))
            .set_json(json!({ "text": "hello" }))
            .to_request(),
    )
    .await;
    let post_uri = format!("/api/v1/posts/{}/", post["id"]);
    let comments_uri = format!("/api/v1/posts/{}/comments/", post["id"]);

    for uri in ["/api/v1/posts/", post_uri.as_str(), comments_uri.as_str(), "/api/v1/groups/"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
    }

    let writes = vec![
        test::TestRequest::post()
            .uri("/api/v1/posts/")
            .set_json(json!({ "text": "x" })),
        test::TestRequest::put()
            .uri(&post_uri)
            .set_json(json!({ "text": "x" })),
        test::TestRequest::patch()
            .uri(&post_uri)
            .set_json(json!({ "text": "x" })),
        test::TestRequest::delete().uri(&post_uri),
        test::TestRequest::post()
            .uri(&comments_uri)
            .set_json(json!({ "text": "x" })),
        test::TestRequest::post()
            .uri("/api/v1/follow/")
            .set_json(json!({ "following": "u1" })),
        test::TestRequest::get().uri("/api/v1/follow/"),
        // body problems never outrank the missing caller
        test::TestRequest::post()
            .uri("/api/v1/follow/")
            .set_json(json!({})),
        test::TestRequest::post()
            .uri("/api/v1/posts/")
            .set_json(json!({})),
        test::TestRequest::post().uri("/api/v1/posts/"),
        test::TestRequest::put()
            .uri(&post_uri)
            .set_json(json!({ "text": 5 })),
        test::TestRequest::patch().uri(&post_uri),
        test::TestRequest::post()
            .uri(&comments_uri)
            .set_json(json!({})),
    ];
    for req in writes {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let unchanged: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri(&post_uri).to_request(),
    )
    .await;
    assert_eq!(unchanged["text"], "hello");
}

#[actix_web::test]
async fn invalid_token_is_rejected_not_downgraded() {
    let store = Arc::new(MemoryStore::new());
    let app = test_app!(store);

    for header in ["Bearer not-a-jwt", "Basic dTE6cGFzcw=="] {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/posts/")
                .insert_header(("Authorization", header))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

#[actix_web::test]
async fn groups_are_read_only() {
    let store = Arc::new(MemoryStore::new());
    let (u1, _u2) = users(&store).await;
    let group = store.insert_group("Cats", "cats", "All about cats").await;
    let app = test_app!(store);

    let fetched: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/groups/{}/", group.id))
            .to_request(),
    )
    .await;
    assert_eq!(fetched["slug"], "cats");
    assert_eq!(fetched["title"], "Cats");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/groups/")
            .insert_header(bearer(&u1))
            .set_json(json!({ "title": "Dogs", "slug": "dogs", "description": "" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/groups/999/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn posts_paginate_with_limit_and_offset() {
    let store = Arc::new(MemoryStore::new());
    let (u1, _u2) = users(&store).await;
    let app = test_app!(store);

    for i in 0..3 {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/posts/")
                .insert_header(bearer(&u1))
                .set_json(json!({ "text": format!("post {}", i) }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let all: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/v1/posts/").to_request(),
    )
    .await;
    assert_eq!(all.as_array().map(Vec::len), Some(3));

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/posts/?limit=2&offset=1")
            .to_request(),
    )
    .await;
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"].as_array().map(Vec::len), Some(2));
    assert_eq!(page["results"][0]["text"], "post 1");
    assert_eq!(page["next"], Value::Null);
    assert_eq!(page["previous"], "/api/v1/posts/?limit=2");
}

#[actix_web::test]
async fn follow_list_is_scoped_and_searchable() {
    let store = Arc::new(MemoryStore::new());
    let (u1, u2) = users(&store).await;
    store.insert_user("carol").await;
    let app = test_app!(store);

    for (who, target) in [(&u1, "u2"), (&u1, "carol"), (&u2, "carol")] {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/follow/")
                .insert_header(bearer(who))
                .set_json(json!({ "following": target }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let mine: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/follow/")
            .insert_header(bearer(&u1))
            .to_request(),
    )
    .await;
    let mine = mine.as_array().expect("array");
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|f| f["user"] == "u1"));

    let searched: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/follow/?search=CAR")
            .insert_header(bearer(&u1))
            .to_request(),
    )
    .await;
    assert_eq!(searched, json!([{ "id": searched[0]["id"], "user": "u1", "following": "carol" }]));
}

#[actix_web::test]
async fn malformed_bodies_are_validation_errors() {
    let store = Arc::new(MemoryStore::new());
    let (u1, _u2) = users(&store).await;
    let app = test_app!(store);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/posts/")
            .insert_header(bearer(&u1))
            .set_json(json!({ "image": "x.jpg" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "required");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/posts/")
            .insert_header(bearer(&u1))
            .set_json(json!({ "text": "" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "blank");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/posts/")
            .insert_header(bearer(&u1))
            .set_json(json!({ "text": "hi", "group": 42 }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid");
}

#[actix_web::test]
async fn health_endpoint_is_open() {
    let store = Arc::new(MemoryStore::new());
    let app = test_app!(store);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/health/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn token_users_are_registered_on_first_write() {
    // No seeded users: identities come only from tokens, as in production.
    let store = Arc::new(MemoryStore::new());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(store.clone())))
            .wrap(IdentityMiddleware::new(JwtValidator::hs256(SECRET, 0)))
            .wrap(NormalizePath::new(TrailingSlash::Always))
            .configure(handlers::configure),
    )
    .await;
    let alice = token_for(Uuid::new_v4(), "alice");
    let bob = token_for(Uuid::new_v4(), "bob");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/posts")
            .insert_header(alice.clone())
            .set_json(json!({ "text": "hello" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Value = test::read_body_json(resp).await;
    assert_eq!(post["author"], "alice");

    // bob is unknown until their first write
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/follow/")
            .insert_header(alice.clone())
            .set_json(json!({ "following": "bob" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/posts/{}/comments/", post["id"]))
            .insert_header(bob.clone())
            .set_json(json!({ "text": "hi alice" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let comment: Value = test::read_body_json(resp).await;
    assert_eq!(comment["author"], "bob");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/follow/")
            .insert_header(alice)
            .set_json(json!({ "following": "bob" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let follow: Value = test::read_body_json(resp).await;
    assert_eq!(follow["user"], "alice");
    assert_eq!(follow["following"], "bob");
}

#[actix_web::test]
async fn out_of_range_paging_is_bounded() {
    let store = Arc::new(MemoryStore::new());
    let (u1, _u2) = users(&store).await;
    let app = test_app!(store);

    for text in ["a", "b"] {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/posts/")
                .insert_header(bearer(&u1))
                .set_json(json!({ "text": text }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/posts/?limit=10&offset={}", i64::MAX))
            .to_request(),
    )
    .await;
    assert_eq!(page["count"], 2);
    assert_eq!(page["results"], json!([]));
    assert_eq!(page["next"], Value::Null);
    assert_eq!(page["previous"], "/api/v1/posts/?limit=10");

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/posts/?limit=1&offset=-5")
            .to_request(),
    )
    .await;
    assert_eq!(page["results"][0]["text"], "a");
    assert_eq!(page["previous"], Value::Null);
    assert_eq!(page["next"], "/api/v1/posts/?limit=1&offset=1");

    // a non-positive limit turns paging off
    for uri in ["/api/v1/posts/?limit=0", "/api/v1/posts/?limit=-3"] {
        let all: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri(uri).to_request(),
        )
        .await;
        assert_eq!(all.as_array().map(Vec::len), Some(2), "GET {}", uri);
    }
}
