use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use nexio::config::Config;
use nexio::db;
use nexio::routes;
use nexio::state::{AppState, DbPool};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    pool: DbPool,
    _dir: TempDir,
}

enum As<'a> {
    Nobody,
    Header(&'a str),
    Bearer(&'a str),
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.bcrypt_cost = 4;
    config
}

fn spawn_app(config: Config) -> TestApp {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("test.db"), 4).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    TestApp {
        router: routes::app(AppState::new(pool.clone(), config)),
        pool,
        _dir: dir,
    }
}

impl TestApp {
    async fn call(&self, method: Method, uri: &str, who: As<'_>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        match who {
            As::Nobody => {}
            As::Header(id) => builder = builder.header("x-user-id", id),
            As::Bearer(token) => {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token))
            }
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str, who: As<'_>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, who, None).await
    }

    async fn post(&self, uri: &str, who: As<'_>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, who, Some(body)).await
    }

    /// Returns (user id, session token).
    async fn signup(&self, name: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/auth/signup",
                As::Nobody,
                json!({
                    "name": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "password": "correct horse"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "signup failed: {body}");
        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    async fn create_post(&self, author: &str, title: &str, category: &str) -> String {
        let (status, body) = self
            .post(
                "/api/posts",
                As::Header(author),
                json!({
                    "title": title,
                    "content": format!("Notes on {}", title),
                    "category": category,
                    "authorId": author
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create post failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    fn count(&self, sql: &str, id: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(sql, rusqlite::params![id], |row| row.get(0))
            .unwrap()
    }
}

fn png(n: usize) -> String {
    format!("data:image/png;base64,{}", "A".repeat(n))
}

#[tokio::test]
async fn health_check() {
    let app = spawn_app(test_config());
    let (status, body) = app.get("/health", As::Nobody).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn signup_login_logout() {
    let app = spawn_app(test_config());

    let (status, body) = app
        .post("/api/auth/signup", As::Nobody, json!({ "email": "a@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name, email, and password are required");

    let (id, token) = app.signup("Ada").await;

    let (status, body) = app
        .post(
            "/api/auth/signup",
            As::Nobody,
            json!({ "name": "Other", "email": "ADA@example.com", "password": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already in use");

    let (status, body) = app
        .post(
            "/api/auth/login",
            As::Nobody,
            json!({ "email": "ada@example.com", "password": "wrong" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, _) = app
        .post(
            "/api/auth/login",
            As::Nobody,
            json!({ "email": "nobody@example.com", "password": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post("/api/auth/login", As::Nobody, json!({ "email": "ada@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email and password are required");

    let (status, body) = app
        .post(
            "/api/auth/login",
            As::Nobody,
            json!({ "email": "ada@example.com", "password": "correct horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.as_str());
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password").is_none());
    let second_token = body["token"].as_str().unwrap().to_string();
    assert_ne!(second_token, token);

    let (status, body) = app.get("/api/auth/me", As::Bearer(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");

    let (status, body) = app
        .call(Method::POST, "/api/auth/logout", As::Bearer(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = app.get("/api/auth/me", As::Bearer(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/auth/me", As::Bearer(&second_token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn identity_rules() {
    let app = spawn_app(test_config());
    let (id, _) = app.signup("Ada").await;

    let (status, _) = app.get("/api/notifications", As::Nobody).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/notifications", As::Header("ghost")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/notifications", As::Header(&id)).await;
    assert_eq!(status, StatusCode::OK);

    // a stale bearer token does not fall back to the header
    let (status, _) = app.get("/api/notifications", As::Bearer("stale")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn header_identity_can_be_disabled() {
    let mut config = test_config();
    config.auth.trust_user_id_header = false;
    let app = spawn_app(config);
    let (id, token) = app.signup("Ada").await;

    let (status, _) = app.get("/api/notifications", As::Header(&id)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/notifications", As::Bearer(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn upvote_scenario() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;

    let post_id = app.create_post(&u1, "Intro to X", "Science").await;

    let (status, feed) = app.get("/api/posts", As::Header(&u2)).await;
    assert_eq!(status, StatusCode::OK);
    let listed = &feed[0];
    assert_eq!(listed["title"], "Intro to X");
    assert_eq!(listed["category"], "Science");
    assert_eq!(listed["upvotesCount"], 0);
    assert_eq!(listed["isUpvoted"], false);
    assert_eq!(listed["author"]["id"], u1.as_str());

    let uri = format!("/api/posts/{}/upvote", post_id);
    let (status, body) = app.call(Method::POST, &uri, As::Header(&u2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, post) = app.get(&format!("/api/posts/{}", post_id), As::Header(&u2)).await;
    assert_eq!(post["upvotesCount"], 1);
    assert_eq!(post["isUpvoted"], true);
    let (_, post) = app.get(&format!("/api/posts/{}", post_id), As::Header(&u1)).await;
    assert_eq!(post["isUpvoted"], false);

    let (_, author) = app.get(&format!("/api/users/{}", u1), As::Nobody).await;
    assert_eq!(author["reputationScore"], 1);

    let (_, inbox) = app.get("/api/notifications", As::Header(&u1)).await;
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["type"], "upvote");
    assert_eq!(inbox[0]["postId"], post_id.as_str());
    assert_eq!(inbox[0]["fromUser"]["id"], u2.as_str());
}

#[tokio::test]
async fn upvote_toggle_keeps_counter_consistent() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;
    let post_id = app.create_post(&u1, "Counting", "Math").await;
    let uri = format!("/api/posts/{}/upvote", post_id);

    let (status, _) = app.call(Method::POST, &uri, As::Nobody, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.call(Method::POST, &uri, As::Header(&u2), None).await;
    let (status, body) = app.call(Method::POST, &uri, As::Header(&u2), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Already upvoted");

    let counter = "SELECT upvotes_count FROM posts WHERE id = ?1";
    let rows = "SELECT COUNT(*) FROM upvotes WHERE post_id = ?1";
    assert_eq!(app.count(counter, &post_id), 1);
    assert_eq!(app.count(rows, &post_id), 1);

    let (status, _) = app.call(Method::DELETE, &uri, As::Header(&u2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.count(counter, &post_id), 0);
    assert_eq!(app.count(rows, &post_id), 0);

    // removing again changes nothing
    let (status, _) = app.call(Method::DELETE, &uri, As::Header(&u2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.count(counter, &post_id), 0);

    let (status, body) = app
        .call(Method::POST, "/api/posts/missing/upvote", As::Header(&u2), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found");
}

#[tokio::test]
async fn save_and_saved_list() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;
    let post_id = app.create_post(&u1, "Keep me", "Art").await;
    let uri = format!("/api/posts/{}/save", post_id);

    app.call(Method::POST, &uri, As::Header(&u2), None).await;
    let (status, body) = app.call(Method::POST, &uri, As::Header(&u2), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Already saved");

    let (_, saved) = app.get(&format!("/api/users/{}/saved", u2), As::Nobody).await;
    let saved = saved.as_array().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["isSaved"], true);
    assert_eq!(saved[0]["savesCount"], 1);

    app.call(Method::DELETE, &uri, As::Header(&u2), None).await;
    let (_, saved) = app.get(&format!("/api/users/{}/saved", u2), As::Nobody).await;
    assert!(saved.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn follow_rules() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;

    let (status, body) = app
        .call(Method::POST, &format!("/api/users/{}/follow", u1), As::Header(&u1), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot follow yourself");

    let (status, _) = app
        .call(Method::POST, "/api/users/ghost/follow", As::Header(&u1), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let follow = format!("/api/users/{}/follow", u2);
    let (status, _) = app.call(Method::POST, &follow, As::Header(&u1), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.call(Method::POST, &follow, As::Header(&u1), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Already following");

    let (_, profile) = app.get(&format!("/api/users/{}", u2), As::Header(&u1)).await;
    assert_eq!(profile["isFollowing"], true);
    assert_eq!(profile["followersCount"], 1);
    let (_, profile) = app.get(&format!("/api/users/{}", u2), As::Nobody).await;
    assert_eq!(profile["isFollowing"], false);

    let (_, followers) = app
        .get(&format!("/api/users/{}/followers", u2), As::Nobody)
        .await;
    assert_eq!(followers[0]["id"], u1.as_str());
    let (_, following) = app
        .get(&format!("/api/users/{}/following", u1), As::Nobody)
        .await;
    assert_eq!(following[0]["id"], u2.as_str());

    let (_, inbox) = app.get("/api/notifications", As::Header(&u2)).await;
    assert_eq!(inbox[0]["type"], "follow");

    let (status, _) = app.call(Method::DELETE, &follow, As::Header(&u1), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, profile) = app.get(&format!("/api/users/{}", u1), As::Nobody).await;
    assert_eq!(profile["followingCount"], 0);
}

#[tokio::test]
async fn post_images_are_validated_and_ordered() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;

    let base = json!({
        "title": "Gallery",
        "content": "Pictures",
        "category": "Art",
        "authorId": u1
    });

    let mut six = base.clone();
    six["images"] = json!(vec![png(4); 6]);
    let (status, body) = app.post("/api/posts", As::Header(&u1), six).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Maximum 5 images allowed per post");

    for bad in ["data:image/webp;base64,AAAA", "data:image/pngx;base64,AAAA"] {
        let mut odd = base.clone();
        odd["images"] = json!([bad]);
        let (status, body) = app.post("/api/posts", As::Header(&u1), odd).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid image type. Only jpg, png, gif allowed");
    }

    let images: Vec<String> = (1..=5).map(png).collect();
    let mut five = base.clone();
    five["images"] = json!(images);
    let (status, body) = app.post("/api/posts", As::Header(&u1), five).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["images"].as_array().unwrap().len(), 5);

    let id = body["id"].as_str().unwrap();
    let (_, post) = app.get(&format!("/api/posts/{}", id), As::Nobody).await;
    let urls: Vec<&str> = post["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["imageUrl"].as_str().unwrap())
        .collect();
    assert_eq!(urls, images.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn large_image_is_rejected_not_truncated() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;

    let (status, body) = app
        .post(
            "/api/posts",
            As::Header(&u1),
            json!({
                "title": "Big",
                "content": "Huge picture",
                "category": "Art",
                "authorId": u1,
                "images": [png(7 * 1024 * 1024)]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Image too large. Maximum 5MB per image");
}

#[tokio::test]
async fn post_creation_requires_fields_and_matching_author() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;

    let (status, body) = app
        .post("/api/posts", As::Header(&u1), json!({ "title": "Only a title" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Title, content, category, and authorId are required"
    );

    let (status, _) = app
        .post(
            "/api/posts",
            As::Header(&u2),
            json!({ "title": "T", "content": "C", "category": "Art", "authorId": u1 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn comment_lifecycle() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;
    let post_id = app.create_post(&u1, "Discuss", "Science").await;
    let comments_uri = format!("/api/posts/{}/comments", post_id);

    let (status, body) = app
        .post(&comments_uri, As::Header(&u2), json!({ "authorId": u2 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Content and authorId are required");

    let (status, _) = app
        .post(
            "/api/posts/missing/comments",
            As::Header(&u2),
            json!({ "content": "hi", "authorId": u2 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, comment) = app
        .post(&comments_uri, As::Header(&u2), json!({ "content": "First!", "authorId": u2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["author"]["name"], "Ugo");
    let comment_id = comment["id"].as_str().unwrap().to_string();

    let (_, list) = app.get(&comments_uri, As::Nobody).await;
    assert_eq!(list[0]["content"], "First!");
    assert_eq!(list[0]["author"]["id"], u2.as_str());

    let (_, inbox) = app.get("/api/notifications", As::Header(&u1)).await;
    assert_eq!(inbox[0]["type"], "comment");

    let delete_uri = format!("/api/comments/{}", comment_id);
    let (status, _) = app.call(Method::DELETE, &delete_uri, As::Header(&u1), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, post) = app.get(&format!("/api/posts/{}", post_id), As::Nobody).await;
    assert_eq!(post["commentsCount"], 1);

    let (status, _) = app.call(Method::DELETE, &delete_uri, As::Header(&u2), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, post) = app.get(&format!("/api/posts/{}", post_id), As::Nobody).await;
    assert_eq!(post["commentsCount"], 0);

    let (status, body) = app.call(Method::DELETE, &delete_uri, As::Header(&u2), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Comment not found");
}

#[tokio::test]
async fn search_thresholds() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    app.create_post(&u1, "Rust ownership", "Programming").await;

    let (_, body) = app.get("/api/search?q=r", As::Nobody).await;
    assert_eq!(body, json!({ "posts": [], "users": [] }));

    let (_, body) = app.get("/api/search?q=zzzz", As::Nobody).await;
    assert_eq!(body, json!({ "posts": [], "users": [] }));

    let (_, body) = app.get("/api/search", As::Nobody).await;
    assert_eq!(body, json!({ "posts": [], "users": [] }));

    let (_, body) = app.get("/api/search?q=rust", As::Header(&u1)).await;
    assert_eq!(body["posts"][0]["title"], "Rust ownership");
    assert_eq!(body["posts"][0]["isUpvoted"], false);

    let (_, body) = app.get("/api/search?q=una", As::Nobody).await;
    assert_eq!(body["users"][0]["id"], u1.as_str());
    assert!(body["users"][0].get("passwordHash").is_none());
}

#[tokio::test]
async fn search_ignores_case_beyond_ascii() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    app.create_post(&u1, "École normale", "Science").await;

    for q in ["%C3%A9cole", "%C3%89COLE"] {
        let (_, body) = app.get(&format!("/api/search?q={}", q), As::Nobody).await;
        assert_eq!(body["posts"][0]["title"], "École normale", "q={q}");
    }
}

#[tokio::test]
async fn profile_updates_are_self_only() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;
    let uri = format!("/api/users/{}", u1);

    let (status, _) = app
        .call(Method::PATCH, &uri, As::Nobody, Some(json!({ "bio": "x" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::PATCH, &uri, As::Header(&u2), Some(json!({ "bio": "x" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::PATCH,
            &uri,
            As::Header(&u1),
            Some(json!({ "bio": "Curious", "expertise": "Physics" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Curious");
    assert_eq!(body["expertise"], "Physics");
    assert_eq!(body["name"], "Una");

    let (status, body) = app.get("/api/users/ghost", As::Nobody).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn feed_filters_and_pages() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    for i in 0..4 {
        let category = if i % 2 == 0 { "Science" } else { "Art" };
        app.create_post(&u1, &format!("Post {}", i), category).await;
    }

    let (_, all) = app.get("/api/posts", As::Nobody).await;
    assert_eq!(all.as_array().unwrap().len(), 4);
    assert_eq!(all[0]["title"], "Post 3");

    let (_, science) = app.get("/api/posts?category=Science", As::Nobody).await;
    let titles: Vec<&str> = science
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Post 2", "Post 0"]);

    let (_, page) = app.get("/api/posts?limit=2&offset=1", As::Nobody).await;
    let titles: Vec<&str> = page
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Post 2", "Post 1"]);

    let (_, mine) = app.get(&format!("/api/users/{}/posts", u1), As::Nobody).await;
    assert_eq!(mine.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn trending_orders_by_upvotes() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;
    let quiet = app.create_post(&u1, "Quiet", "Art").await;
    let loud = app.create_post(&u1, "Loud", "Art").await;
    let _newest = app.create_post(&u1, "Newest", "Art").await;

    for voter in [&u1, &u2] {
        app.call(Method::POST, &format!("/api/posts/{}/upvote", loud), As::Header(voter), None)
            .await;
    }
    app.call(Method::POST, &format!("/api/posts/{}/upvote", quiet), As::Header(&u2), None)
        .await;

    let (_, trending) = app.get("/api/posts/trending", As::Nobody).await;
    let titles: Vec<&str> = trending
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Loud", "Quiet", "Newest"]);
}

#[tokio::test]
async fn post_edit_and_delete_permissions() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;
    let post_id = app.create_post(&u1, "Draft", "Art").await;
    let uri = format!("/api/posts/{}", post_id);

    let (status, _) = app
        .call(Method::PATCH, &uri, As::Header(&u2), Some(json!({ "title": "Hijacked" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::PATCH, &uri, As::Header(&u1), Some(json!({ "title": "Final" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Final");
    assert_eq!(body["content"], "Notes on Draft");

    app.post(
        &format!("{}/comments", uri),
        As::Header(&u2),
        json!({ "content": "nice", "authorId": u2 }),
    )
    .await;

    let (status, _) = app.call(Method::DELETE, &uri, As::Header(&u2), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::DELETE, &uri, As::Header(&u1), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&uri, As::Nobody).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.count("SELECT COUNT(*) FROM comments WHERE post_id = ?1", &post_id),
        0
    );
    assert_eq!(
        app.count("SELECT posts_count FROM users WHERE id = ?1", &u1),
        0
    );
}

#[tokio::test]
async fn notification_reads() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;
    let (u3, _) = app.signup("Uma").await;
    app.call(Method::POST, &format!("/api/users/{}/follow", u1), As::Header(&u2), None)
        .await;
    app.call(Method::POST, &format!("/api/users/{}/follow", u1), As::Header(&u3), None)
        .await;

    let (_, count) = app.get("/api/notifications/unread-count", As::Header(&u1)).await;
    assert_eq!(count["count"], 2);

    let (_, inbox) = app.get("/api/notifications", As::Header(&u1)).await;
    let first = inbox[0]["id"].as_str().unwrap().to_string();
    assert_eq!(inbox[0]["isRead"], false);

    let read_uri = format!("/api/notifications/{}/read", first);
    let (status, _) = app.call(Method::POST, &read_uri, As::Header(&u2), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::POST, &read_uri, As::Header(&u1), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, count) = app.get("/api/notifications/unread-count", As::Header(&u1)).await;
    assert_eq!(count["count"], 1);

    let (status, _) = app
        .call(Method::POST, "/api/notifications/mark-all-read", As::Nobody, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .call(Method::POST, "/api/notifications/mark-all-read", As::Header(&u1), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, count) = app.get("/api/notifications/unread-count", As::Header(&u1)).await;
    assert_eq!(count["count"], 0);
}

#[tokio::test]
async fn reports_and_review() {
    let app = spawn_app(test_config());
    let (u1, _) = app.signup("Una").await;
    let (u2, _) = app.signup("Ugo").await;
    let post_id = app.create_post(&u1, "Questionable", "Art").await;

    let (status, body) = app
        .post("/api/reports", As::Header(&u2), json!({ "postId": post_id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "PostId, reporterId, and reason are required");

    let (status, _) = app
        .post(
            "/api/reports",
            As::Header(&u2),
            json!({ "postId": "missing", "reporterId": u2, "reason": "spam" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, report) = app
        .post(
            "/api/reports",
            As::Header(&u2),
            json!({ "postId": post_id, "reporterId": u2, "reason": "spam" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "pending");
    let report_id = report["id"].as_str().unwrap().to_string();

    let (status, _) = app.get("/api/reports", As::Header(&u2)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.pool
        .get()
        .unwrap()
        .execute("UPDATE users SET is_admin = 1 WHERE id = ?1", rusqlite::params![u1])
        .unwrap();

    let (status, list) = app.get("/api/reports", As::Header(&u1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["reason"], "spam");

    let review_uri = format!("/api/reports/{}", report_id);
    let (status, _) = app
        .call(Method::PATCH, &review_uri, As::Header(&u1), Some(json!({ "status": "bogus" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::PATCH, &review_uri, As::Header(&u1), Some(json!({ "status": "dismissed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = app.get("/api/reports", As::Header(&u1)).await;
    assert_eq!(list[0]["status"], "dismissed");
}
