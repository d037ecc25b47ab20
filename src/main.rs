use axum::{extract::DefaultBodyLimit, Extension, Router};
use qna::config::{self, env_or};
use qna::services::bootstrap_admin::ensure_bootstrap_admin;
use qna::services::email::EmailService;
use qna::services::upload::{UploadConfig, IMAGE_URL_PREFIX};
use qna::{handlers, migration, routes, utils};
use sea_orm_migration::MigratorTrait;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        // System
        handlers::system::hello,
        handlers::system::healthcheck,
        handlers::system::metrics,
        // Auth
        handlers::auth::signup,
        handlers::auth::login_with_email,
        handlers::auth::login_with_tel,
        handlers::auth::autologin,
        handlers::auth::logout,
        handlers::auth::forgot_password,
        handlers::auth::check_reset_code,
        handlers::auth::reset_password,
        // User
        handlers::user::list_users,
        handlers::user::get_user,
        handlers::user::update_user,
        handlers::user::load_avatar,
        handlers::user::delete_avatar,
        // Question
        handlers::question::list_questions,
        handlers::question::get_question,
        handlers::question::list_user_questions,
        handlers::question::create_question,
        handlers::question::update_question,
        handlers::question::delete_question,
        handlers::question::delete_question_images,
        // Comment
        handlers::comment::add_comment,
        handlers::comment::update_comment,
        handlers::comment::delete_comment,
        handlers::comment::list_comments,
        handlers::comment::like_comment,
        handlers::comment::dislike_comment,
        handlers::comment::reaction_count,
        // Tag
        handlers::tag::list_tags,
        // Admin
        handlers::admin::get_statistics,
        handlers::admin::six_months_data,
        handlers::admin::delete_user,
        handlers::admin::add_tag,
        handlers::admin::delete_tag,
    ),
    components(
        schemas(
            qna::response::Message,
            qna::error::ErrorResponse,
            qna::error::AppError,
            // Auth
            handlers::auth::SignupRequest,
            handlers::auth::EmailLoginRequest,
            handlers::auth::TelLoginRequest,
            handlers::auth::LoginResponse,
            handlers::auth::ForgotPasswordRequest,
            handlers::auth::CheckCodeRequest,
            handlers::auth::ResetPasswordRequest,
            // User
            handlers::user::UserResponse,
            handlers::user::PrivateUserResponse,
            handlers::user::UserSummary,
            handlers::user::UpdateUserRequest,
            handlers::user::AvatarUpload,
            // Question
            handlers::question::QuestionResponse,
            handlers::question::UpdateQuestionRequest,
            handlers::question::DeleteImagesRequest,
            handlers::question::QuestionUpload,
            // Comment
            handlers::comment::CommentResponse,
            handlers::comment::CommentRequest,
            handlers::comment::CommentUpload,
            handlers::comment::ReactionResponse,
            qna::services::reaction::ReactionState,
            qna::services::reaction::ReactionCounts,
            // Tag
            handlers::tag::TagResponse,
            // Admin
            handlers::admin::StatisticsResponse,
            handlers::admin::MonthlyActivityResponse,
            handlers::admin::AddTagRequest,
        )
    ),
    tags(
        (name = "system", description = "Liveness and metrics"),
        (name = "auth", description = "Sessions and password reset"),
        (name = "user", description = "User profiles"),
        (name = "question", description = "Questions"),
        (name = "comment", description = "Comments and reactions"),
        (name = "tags", description = "Tags"),
        (name = "admin", description = "Administrative operations"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    // Validate configuration before doing anything else
    let jwt_config = validate_config()?;
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting Q&A API v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::get_database().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    ensure_bootstrap_admin(&db).await?;

    let upload_config = UploadConfig::from_env();

    let email_service = EmailService::from_env();
    if email_service.is_configured() {
        tracing::info!("SMTP email service configured");
    } else {
        tracing::warn!("SMTP not configured, reset codes will not be mailed");
    }

    let app = create_app(&upload_config.upload_dir)?
        .layer(Extension(db))
        .layer(Extension(upload_config))
        .layer(Extension(email_service));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "qna=debug,tower_http=debug,axum=debug".into());
    let json = env::var("LOG_FORMAT")
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<config::jwt::JwtConfig> {
    let jwt_config = config::jwt::JwtConfig::from_env()?;

    // Checked here for an early error; the actual connection happens later
    if env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    let upload_dir = UploadConfig::from_env().upload_dir;
    std::fs::create_dir_all(&upload_dir).map_err(|e| {
        anyhow::anyhow!("Failed to create upload directory '{}': {}", upload_dir, e)
    })?;

    Ok(jwt_config)
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins_str.trim() == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        // Cookie sessions need credentials, which browsers refuse with a wildcard origin.
        cors.allow_origin(origins).allow_credentials(true)
    }
}

fn create_app(upload_dir: &str) -> anyhow::Result<Router> {
    let max_body = env_or("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES);

    Ok(Router::new()
        .merge(routes::create_routes()?)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service(IMAGE_URL_PREFIX, ServeDir::new(upload_dir))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
