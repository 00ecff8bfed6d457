//! Shared harness for the HTTP tests. Each test builds the real router
//! against the database in TEST_DATABASE_URL with a throwaway media
//! directory. The tests using it are `#[ignore]`d unless run with
//! `--ignored`.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use diesel::prelude::*;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat};
use larder_server::auth::create_session;
use larder_server::config::Config;
use larder_server::db::{create_pool, DbPool};
use larder_server::models::{NewUser, User};
use larder_server::schema::users;
use larder_server::{app, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "larder-test-boundary";

static POOL: OnceLock<DbPool> = OnceLock::new();

fn shared_pool() -> Option<DbPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    Some(
        POOL.get_or_init(|| create_pool(&url).expect("Failed to connect to TEST_DATABASE_URL"))
            .clone(),
    )
}

pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub token: String,
}

pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    media: TempDir,
}

impl TestApp {
    /// `None` when no test database is configured.
    pub fn new() -> Option<Self> {
        let pool = shared_pool()?;
        let media = TempDir::new().expect("Failed to create media dir");

        let config = Config {
            database_url: String::new(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            media_root: media.path().to_path_buf(),
            media_url: "/media".to_string(),
            max_image_bytes: 1024 * 1024,
        };
        let router = app(AppState::new(pool.clone(), &config), &config);

        Some(Self {
            router,
            pool,
            media,
        })
    }

    pub fn media_root(&self) -> &Path {
        self.media.path()
    }

    pub fn media_path(&self, url: &str) -> PathBuf {
        self.media_root()
            .join(url.trim_start_matches("/media/"))
    }

    /// Insert an account directly and open a session for it. The password
    /// hash is unusable, so these users can only act through their token.
    pub fn user(&self) -> TestUser {
        let mut conn = self.pool.get().unwrap();
        let email = format!("{}@example.com", Uuid::new_v4());

        let user: User = diesel::insert_into(users::table)
            .values(&NewUser {
                email: &email,
                name: "Test Name",
                password_hash: "!",
                is_staff: false,
                is_superuser: false,
            })
            .returning(User::as_returning())
            .get_result(&mut conn)
            .unwrap();

        let token = create_session(&mut conn, user.id).unwrap();
        TestUser {
            id: user.id,
            email,
            token,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.json(Method::GET, uri, Some(user.token.as_str()), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, Some(user.token.as_str()), Some(body))
            .await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.json(Method::PATCH, uri, Some(user.token.as_str()), Some(body))
            .await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.json(Method::PUT, uri, Some(user.token.as_str()), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> StatusCode {
        self.json(Method::DELETE, uri, Some(user.token.as_str()), None)
            .await
            .0
    }

    /// POST a recipe with defaults filled in and return its id.
    pub async fn recipe(&self, user: &TestUser, extra: Value) -> i64 {
        let mut body = serde_json::json!({
            "title": "Sample recipe",
            "time_minutes": 10,
            "price": "5.00",
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }

        let (status, recipe) = self.post("/api/recipes", user, body).await;
        assert_eq!(status, StatusCode::CREATED, "{recipe}");
        recipe["id"].as_i64().unwrap()
    }

    pub async fn upload(
        &self,
        recipe_id: i64,
        user: &TestUser,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"upload\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/recipes/{recipe_id}/image"))
            .header(header::AUTHORIZATION, format!("Bearer {}", user.token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

pub fn png() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(10, 10)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// `name` values of a list of `{id, name}` objects.
pub fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap().to_string())
        .collect()
}

pub fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_i64().unwrap())
        .collect()
}
