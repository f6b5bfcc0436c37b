use axum::body::Body;
use http_body_util::BodyExt;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    file: Option<PathBuf>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(path) = &self.file {
            for suffix in ["", "-journal", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
            }
        }
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory SQLite pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let router = quill::build_app(pool.clone(), false)
            .await
            .expect("Failed to build app");

        Self { router, db: pool, file: None }
    }

    /// An app over a temporary database file with the production pool
    /// settings, for tests that need several connections at once.
    pub async fn on_disk() -> Self {
        let path = std::env::temp_dir().join(format!("quill-test-{}.db", uuid::Uuid::new_v4()));
        let pool = quill::db::init_pool(&format!("sqlite:{}", path.display()))
            .await
            .expect("Failed to open on-disk pool");

        let router = quill::build_app(pool.clone(), false)
            .await
            .expect("Failed to build app");

        Self { router, db: pool, file: Some(path) }
    }

    /// Make every insert into `post_tag` fail.
    pub async fn break_post_tag_inserts(&self) {
        sqlx::query(
            "CREATE TRIGGER fail_post_tag BEFORE INSERT ON post_tag BEGIN SELECT RAISE(ABORT, 'post_tag insert refused'); END",
        )
        .execute(&self.db)
        .await
        .expect("Failed to install trigger");
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    /// Create a user in the database and return (user_id, invite_code).
    pub async fn create_user(&self, name: &str) -> (i64, String) {
        let invite_code = format!("invite-{}", name.to_lowercase().replace(' ', "-"));
        let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        let now = chrono::Utc::now().to_rfc3339();

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO users (name, email, invite_code, created_at, updated_at) VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(&email)
        .bind(&invite_code)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.db)
        .await
        .expect("Failed to create test user");

        (id, invite_code)
    }

    /// Create a tag in the database and return its id.
    pub async fn create_tag(&self, name: &str, slug: &str) -> i64 {
        let now = chrono::Utc::now().to_rfc3339();

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO tags (name, slug, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(slug)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.db)
        .await
        .expect("Failed to create test tag");

        id
    }

    /// Tag ids currently associated with a post, ascending.
    pub async fn post_tag_ids(&self, post_id: i64) -> Vec<i64> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT tag_id FROM post_tag WHERE post_id = ? ORDER BY tag_id")
                .bind(post_id)
                .fetch_all(&self.db)
                .await
                .unwrap();
        rows.into_iter().map(|(id,)| id).collect()
    }

    pub async fn count(&self, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.db)
            .await
            .unwrap();
        count
    }

    /// Log in as the given user and return the session cookie string.
    pub async fn login(&self, invite_code: &str) -> String {
        let resp = self
            .send_json("POST", "/login", serde_json::json!({ "invite_code": invite_code }), None)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        resp.headers()
            .get("set-cookie")
            .expect("Login should set a session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    /// Send a GET request with an optional session cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Send a JSON body with the given method and an optional session cookie.
    pub async fn send_json(&self, method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method(method)
            .header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.request(req).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response {
        self.send_json("POST", uri, body, None).await
    }

    pub async fn put_json(&self, uri: &str, body: Value) -> Response {
        self.send_json("PUT", uri, body, None).await
    }

    pub async fn patch_json(&self, uri: &str, body: Value) -> Response {
        self.send_json("PATCH", uri, body, None).await
    }

    /// Send a POST form request with an optional session cookie.
    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.request(req).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        let req = Request::builder()
            .uri(uri)
            .method("DELETE")
            .body(Body::empty())
            .unwrap();
        self.request(req).await
    }
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Read the full response body as JSON.
pub async fn body_json(resp: Response) -> Value {
    let body = body_string(resp).await;
    serde_json::from_str(&body).unwrap_or_else(|e| panic!("Invalid JSON body {body:?}: {e}"))
}

/// Assert a 422 envelope and return its `errors` object.
pub async fn assert_validation_failed(resp: Response) -> Value {
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Validation failed");
    assert!(json.get("data").is_none());
    json["errors"].clone()
}
