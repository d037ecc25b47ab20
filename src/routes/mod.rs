use crate::config::rate_limit::{RateLimitConfig, RateLimitRule, RouteGroup};
use crate::handlers;
use crate::metrics::Metrics;
use crate::middleware::auth::{admin_middleware, auth_middleware};
use crate::middleware::metrics::track_metrics;
use axum::{middleware, routing, Extension, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

/// Every API route, with request metrics recorded under the matched route template.
pub fn create_routes() -> anyhow::Result<Router> {
    let rate_limit_config = RateLimitConfig::from_env();

    let auth = auth_routes(&rate_limit_config);
    let public_read = public_read_routes(&rate_limit_config);
    let protected =
        protected_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));
    let admin = admin_routes(&rate_limit_config)
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn(auth_middleware));

    let metrics = Metrics::new()?;

    Ok(Router::new()
        .merge(system_routes())
        .merge(auth)
        .merge(public_read)
        .merge(protected)
        .merge(admin)
        .route_layer(middleware::from_fn(track_metrics))
        .layer(Extension(metrics)))
}

fn system_routes() -> Router {
    Router::new()
        .route("/", routing::get(handlers::system::hello))
        .route("/healthcheck", routing::get(handlers::system::healthcheck))
        .route("/metrics", routing::get(handlers::system::metrics))
}

/// Session routes that do not need a session.
fn auth_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/auth/signup", routing::post(handlers::auth::signup))
        .route(
            "/auth/login-with-email",
            routing::post(handlers::auth::login_with_email),
        )
        .route(
            "/auth/login-with-tel",
            routing::post(handlers::auth::login_with_tel),
        )
        .route("/auth/logout", routing::post(handlers::auth::logout))
        .route(
            "/auth/forgot_password",
            routing::post(handlers::auth::forgot_password),
        )
        .route(
            "/auth/password_reset",
            routing::post(handlers::auth::check_reset_code),
        )
        .route(
            "/auth/password_reset/verify",
            routing::post(handlers::auth::reset_password),
        );

    with_optional_rate_limit(router, config, RouteGroup::Auth)
}

/// Anonymous reads.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Users
        .route("/user", routing::get(handlers::user::list_users))
        .route("/user/", routing::get(handlers::user::list_users))
        .route("/user/{id}", routing::get(handlers::user::get_user))
        // Questions
        .route(
            "/question/questions",
            routing::get(handlers::question::list_questions),
        )
        .route(
            "/question/{id}",
            routing::get(handlers::question::get_question),
        )
        .route(
            "/question/by/{id}",
            routing::get(handlers::question::list_user_questions),
        )
        // Comments
        .route(
            "/comment/{id}/comments",
            routing::get(handlers::comment::list_comments),
        )
        .route(
            "/comment/{id}/reaction-count",
            routing::get(handlers::comment::reaction_count),
        )
        // Tags
        .route("/tags", routing::get(handlers::tag::list_tags))
        .route("/tags/", routing::get(handlers::tag::list_tags));

    with_optional_rate_limit(router, config, RouteGroup::Public)
}

/// Writes by signed-in users.
fn protected_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Auth
        .route("/auth/autologin", routing::get(handlers::auth::autologin))
        // Users
        .route("/user/update", routing::put(handlers::user::update_user))
        .route(
            "/user/load-avatar",
            routing::put(handlers::user::load_avatar),
        )
        .route(
            "/user/delete-avatar",
            routing::put(handlers::user::delete_avatar),
        )
        // Questions
        .route(
            "/question/create",
            routing::post(handlers::question::create_question),
        )
        .route(
            "/question/{id}/update",
            routing::put(handlers::question::update_question),
        )
        .route(
            "/question/{id}/delete",
            routing::delete(handlers::question::delete_question),
        )
        .route(
            "/question/delete-images",
            routing::delete(handlers::question::delete_question_images),
        )
        // Comments
        .route(
            "/comment/{id}/add-comment",
            routing::post(handlers::comment::add_comment),
        )
        .route(
            "/comment/{id}/update-comment",
            routing::put(handlers::comment::update_comment),
        )
        .route(
            "/comment/{id}/delete-comment",
            routing::delete(handlers::comment::delete_comment),
        )
        .route(
            "/comment/{id}/like",
            routing::post(handlers::comment::like_comment),
        )
        .route(
            "/comment/{id}/dislike",
            routing::post(handlers::comment::dislike_comment),
        );

    with_optional_rate_limit(router, config, RouteGroup::Protected)
}

fn admin_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/admin/get-statics",
            routing::get(handlers::admin::get_statistics),
        )
        .route(
            "/admin/six-months-data",
            routing::get(handlers::admin::six_months_data),
        )
        .route(
            "/admin/{id}/delete-user",
            routing::delete(handlers::admin::delete_user),
        )
        .route("/admin/add-tag", routing::post(handlers::admin::add_tag))
        .route(
            "/admin/{id}/delete-tag",
            routing::delete(handlers::admin::delete_tag),
        );

    with_optional_rate_limit(router, config, RouteGroup::Protected)
}

fn with_optional_rate_limit(router: Router, config: &RateLimitConfig, group: RouteGroup) -> Router {
    if !config.enabled {
        return router;
    }

    let RateLimitRule {
        per_second,
        burst_size,
    } = config.rule(group);
    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(per_second)
        .burst_size(burst_size)
        .finish()
    else {
        tracing::warn!(?group, "Invalid rate limit rule, leaving routes unthrottled");
        return router;
    };

    router.layer(GovernorLayer::new(governor_conf))
}
