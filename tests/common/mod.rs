#![allow(dead_code)]

use reqwest::{multipart, Client};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Once,
};
use tokio::sync::OnceCell;
use uuid::Uuid;

static INIT: Once = Once::new();
static SCHEMA_READY: OnceCell<()> = OnceCell::const_new();
static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const TEST_PASSWORD: &str = "test_password_123";
pub const UPLOAD_DIR: &str = "./test_uploads";

/// Smallest byte string that passes the png signature check.
pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = qna::config::jwt::JwtConfig::from_env().unwrap();
        let _ = qna::utils::jwt::init_jwt_config(config);
        std::fs::create_dir_all(UPLOAD_DIR).unwrap();
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
    pub nickname: String,
    pub email: String,
    pub tel: String,
}

pub async fn spawn_app() -> TestApp {
    init_env();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"));

    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    // Migrate and wipe once per test binary; tests use unique identities so they can share data.
    SCHEMA_READY
        .get_or_init(|| async {
            qna::migration::Migrator::up(&db, None)
                .await
                .expect("Failed to run migrations");
            cleanup_tables(&db).await;
        })
        .await;

    let upload_config = qna::services::upload::UploadConfig {
        upload_dir: UPLOAD_DIR.to_string(),
    };
    let email_service = qna::services::email::EmailService::disabled();

    let app = axum::Router::new()
        .merge(qna::routes::create_routes().expect("Failed to build routes"))
        .nest_service(
            qna::services::upload::IMAGE_URL_PREFIX,
            tower_http::services::ServeDir::new(UPLOAD_DIR),
        )
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(upload_config))
        .layer(axum::extract::Extension(email_service));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
    }
}

async fn cleanup_tables(db: &DatabaseConnection) {
    let tables = [
        "reset_codes",
        "comment_reactions",
        "comments",
        "questions_tags",
        "questions",
        "tags",
        "users",
    ];

    for table in tables {
        let sql = format!("TRUNCATE TABLE {} CASCADE", table);
        let _ = db
            .execute(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                sql,
            ))
            .await;
    }
}

/// A name nobody else in this test run has used.
pub fn unique(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}_{}_{}", prefix, n, &Uuid::new_v4().simple().to_string()[..8])
}

pub async fn json_body(resp: reqwest::Response) -> Value {
    resp.json().await.expect("Failed to parse response body")
}

pub fn data_id(body: &Value) -> Uuid {
    body["data"]["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("Response missing data.id: {body}"))
}

pub fn signup_body(nickname: &str) -> Value {
    json!({
        "name": "Test",
        "lastname": "User",
        "nickname": nickname,
        "website": "",
        "about": "",
        "email": format!("{}@test.com", nickname),
        "tel": format!("+1{}", &Uuid::new_v4().as_u128().to_string()[..10]),
        "password": TEST_PASSWORD,
    })
}

/// Sign up and log in a fresh user.
pub async fn create_test_user(app: &TestApp, prefix: &str) -> TestUser {
    let nickname = unique(prefix);
    let body = signup_body(&nickname);

    let resp = app
        .client
        .post(app.url("/auth/signup"))
        .json(&body)
        .send()
        .await
        .expect("Failed to sign up");
    let status = resp.status();
    let signed_up = json_body(resp).await;
    assert_eq!(status, 200, "signup failed: {signed_up}");
    let id = data_id(&signed_up);

    let email = body["email"].as_str().unwrap().to_string();
    let tel = body["tel"].as_str().unwrap().to_string();
    let token = login(app, &email).await;

    TestUser {
        id,
        token,
        nickname,
        email,
        tel,
    }
}

pub async fn login(app: &TestApp, email: &str) -> String {
    let resp = app
        .client
        .post(app.url("/auth/login-with-email"))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .expect("Failed to log in");
    let body = json_body(resp).await;
    body["data"]["token"]
        .as_str()
        .unwrap_or_else(|| panic!("Login response missing token: {body}"))
        .to_string()
}

/// Make a user admin by directly updating the database.
pub async fn make_admin(db: &DatabaseConnection, user_id: Uuid) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "UPDATE users SET role = 'admin' WHERE id = $1",
        vec![user_id.into()],
    ))
    .await
    .expect("Failed to make user admin");
}

pub async fn create_admin(app: &TestApp) -> TestUser {
    let admin = create_test_user(app, "admin").await;
    make_admin(&app.db, admin.id).await;
    admin
}

pub async fn create_tag(app: &TestApp, admin_token: &str, prefix: &str) -> (Uuid, String) {
    let resp = app
        .client
        .post(app.url("/admin/add-tag"))
        .bearer_auth(admin_token)
        .json(&json!({ "name": unique(prefix) }))
        .send()
        .await
        .expect("Failed to add tag");
    let body = json_body(resp).await;
    let name = body["data"]["name"].as_str().unwrap().to_string();
    (data_id(&body), name)
}

pub fn png_part() -> multipart::Part {
    multipart::Part::bytes(PNG.to_vec())
        .file_name("pixel.png")
        .mime_str("image/png")
        .unwrap()
}

/// Post a question through the multipart endpoint and return the response body.
pub async fn create_question(
    app: &TestApp,
    token: &str,
    header: &str,
    tags: &[Uuid],
    images: usize,
) -> Value {
    let tag_list = tags
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let mut form = multipart::Form::new()
        .text("header", header.to_string())
        .text("content", "Some **markdown** content".to_string())
        .text("tags", tag_list);
    for _ in 0..images {
        form = form.part("images", png_part());
    }

    let resp = app
        .client
        .post(app.url("/question/create"))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to create question");
    let status = resp.status();
    let body = json_body(resp).await;
    assert_eq!(status, 200, "create question failed: {body}");
    body
}

pub async fn add_comment(app: &TestApp, token: &str, question_id: Uuid, text: &str) -> Value {
    let form = multipart::Form::new().text("comment", text.to_string());
    let resp = app
        .client
        .post(app.url(&format!("/comment/{question_id}/add-comment")))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to add comment");
    let status = resp.status();
    let body = json_body(resp).await;
    assert_eq!(status, 200, "add comment failed: {body}");
    body
}
