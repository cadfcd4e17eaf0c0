use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tempfile::TempDir;

use mediatheque::config::Config;
use mediatheque::mailer::MailTransport;
use mediatheque::models::MediaKind;
use mediatheque::storage::{FileStorage, LocalStorage};

/// A 1x1 RGBA PNG, enough to exercise real derivative generation.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0xfc,
    0xcf, 0xc0, 0x50, 0x0f, 0x00, 0x04, 0x85, 0x01, 0x80, 0x84, 0xa9, 0x8c, 0x21, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Transport that records every delivery and reports success.
#[derive(Default)]
pub struct RecordingMailTransport {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailTransport {
    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl MailTransport for RecordingMailTransport {
    fn send(&self, to: &str, subject: &str, _body: &str, _from: &str, _locale: &str) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        true
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub storage: LocalStorage,
    pub mail: Arc<RecordingMailTransport>,
    // Held so the storage roots outlive the test.
    _storage_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory SQLite pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let storage_dir = TempDir::new().expect("Failed to create temp storage");
        let config = Config {
            base_url: "http://localhost:3000".to_string(),
            private_dir: storage_dir.path().join("private"),
            public_dir: storage_dir.path().join("public"),
            temporary_dir: storage_dir.path().join("tmp"),
            smtp_relay: None,
            smtp_from: Some("dam@example.com".to_string()),
        };

        let storage = LocalStorage::new(&config);
        let mail = Arc::new(RecordingMailTransport::default());

        let router = mediatheque::build_app(pool.clone(), config, mail.clone(), false).await;

        Self {
            router,
            db: pool,
            storage,
            mail,
            _storage_dir: storage_dir,
        }
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    /// Create a user in the database and return (user_id, invite_code).
    pub async fn create_user(&self, name: &str, email: Option<&str>) -> (String, String) {
        let id = uuid::Uuid::new_v4().to_string();
        let invite_code = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, name, email, invite_code, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(&invite_code)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create test user");

        (id, invite_code)
    }

    /// Log in as the given user and return the session cookie string.
    pub async fn login(&self, invite_code: &str) -> String {
        let req = Request::builder()
            .uri("/login")
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(format!("invite_code={}", invite_code)))
            .unwrap();

        let resp = self.request(req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

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

    /// Seed an image style.
    pub async fn create_style(&self, id: &str, label: &str, width: i64, height: i64) {
        sqlx::query(
            "INSERT INTO image_styles (id, label, width, height, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(label)
        .bind(width)
        .bind(height)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.db)
        .await
        .expect("Failed to create style");
    }

    /// Seed a media asset with files written to private storage. Each
    /// file is `(slot, filename, contents)`.
    pub async fn create_media(
        &self,
        owner_id: &str,
        kind: MediaKind,
        name: &str,
        files: &[(&str, &str, &[u8])],
    ) -> String {
        let media_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO media (id, kind, name, owner_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&media_id)
        .bind(kind)
        .bind(name)
        .bind(owner_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create media");

        for (position, (slot, filename, contents)) in files.iter().enumerate() {
            let uri = format!("private://media/{media_id}/{filename}");
            self.storage
                .write(&uri, contents)
                .expect("Failed to write media file");

            let file_id = uuid::Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO files (id, uri, filename, filesize, filemime, owner_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&file_id)
            .bind(&uri)
            .bind(filename)
            .bind(contents.len() as i64)
            .bind(guess_mime(filename))
            .bind(owner_id)
            .bind(&now)
            .execute(&self.db)
            .await
            .expect("Failed to create file record");

            sqlx::query(
                "INSERT INTO media_files (media_id, slot, file_id, position) VALUES (?, ?, ?, ?)",
            )
            .bind(&media_id)
            .bind(slot)
            .bind(&file_id)
            .bind(position as i64)
            .execute(&self.db)
            .await
            .expect("Failed to attach file");
        }

        media_id
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

    /// Send a POST request with a JSON body and an optional session cookie.
    pub async fn post_json(
        &self,
        uri: &str,
        body: &serde_json::Value,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.request(req).await
    }

    /// Send a POST request with an empty body and an optional session cookie.
    pub async fn post(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri).method("POST");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Send a DELETE request with a JSON body and an optional session cookie.
    pub async fn delete_json(
        &self,
        uri: &str,
        body: &serde_json::Value,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method("DELETE")
            .header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.request(req).await
    }

    /// Count zip archives anywhere under the private storage root.
    pub fn private_zip_count(&self) -> usize {
        fn walk(dir: &std::path::Path, count: &mut usize) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, count);
                } else if path.extension().is_some_and(|ext| ext == "zip") {
                    *count += 1;
                }
            }
        }

        let mut count = 0;
        if let Some(root) = self.storage.realpath("private://") {
            walk(&root, &mut count);
        }
        count
    }
}

fn guess_mime(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        Some("mp4") => "video/mp4",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Read the full response body as raw bytes.
pub async fn body_bytes(resp: Response) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Read the full response body as JSON.
pub async fn body_json(resp: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}
