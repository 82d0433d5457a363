//! Verdant is a plant care tracking and account management API.

#![forbid(unsafe_code)]

pub mod cache;
pub mod care;
pub mod config;
pub mod crypto;
pub mod error;
pub mod mail;
pub mod plant;
pub mod router;
mod store;
#[cfg(test)]
mod testing;
pub mod token;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, header};
use axum::routing::{delete, get, post};
use axum::{Router, middleware as AxumMiddleware};
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

const DEFAULT_CREDENTIALS: &str = "postgres";
const DEFAULT_DATABASE_NAME: &str = "verdant";
const DEFAULT_POOL_SIZE: u32 = 10;

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub token: token::TokenManager,
    pub accounts: user::AccountService,
    pub users: Arc<dyn user::UserStore>,
    pub plants: Arc<dyn plant::PlantStore>,
    pub cares: Arc<dyn care::CareStore>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .include_headers(true)
                        .level(tracing::Level::INFO),
                )
                .on_request(DefaultOnRequest::new())
                .on_response(
                    DefaultOnResponse::new()
                        .include_headers(true)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
        // Set a timeout.
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    // Administrative routes, hidden behind the API key.
    let admin = Router::new()
        .route("/users/{id}", delete(router::users::delete_user))
        .route("/change-roles", post(router::users::change_roles))
        .route_layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            router::require_api_key,
        ));

    let api = Router::new()
        .route("/register", post(router::users::register))
        .route("/login", post(router::users::login))
        .route("/verify-email", post(router::users::verify_email))
        .route("/refresh-token", post(router::users::refresh_token))
        .route("/me", get(router::users::me))
        .route(
            "/set-active",
            axum::routing::patch(router::users::set_active),
        )
        .route("/reset-password", post(router::users::request_reset))
        .route(
            "/reset-password/{code}",
            post(router::users::change_password)
                .get(router::users::reset_status),
        )
        .route(
            "/plants",
            post(router::plants::create).get(router::plants::list),
        )
        .route(
            "/plants/{id}",
            get(router::plants::get)
                .patch(router::plants::update)
                .delete(router::plants::delete),
        )
        .route("/cares", post(router::cares::create))
        .route(
            "/cares/{id}",
            get(router::cares::get)
                .patch(router::cares::update)
                .delete(router::cares::delete),
        )
        .route("/cares/plant/{id}", get(router::cares::list_by_plant))
        .merge(admin);

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(middleware)
}

/// Initialize the application state.
///
/// Returns the state plus the mail worker handle, so shutdown can drain
/// outstanding sends after the last dispatcher is dropped.
pub async fn initialize_state()
-> Result<(AppState, JoinHandle<()>), Box<dyn std::error::Error>> {
    let config = config::Configuration::default().read()?;

    let Some(pg) = config.postgres.clone() else {
        tracing::error!("missing `postgres` entry on `config.yaml` file");
        std::process::exit(0);
    };
    let addr = format!(
        "postgres://{}:{}@{}/{}",
        pg.username.unwrap_or(DEFAULT_CREDENTIALS.into()),
        pg.password.unwrap_or(DEFAULT_CREDENTIALS.into()),
        pg.address,
        pg.database.unwrap_or(DEFAULT_DATABASE_NAME.into()),
    );
    let pool = PgPoolOptions::new()
        .max_connections(pg.pool_size.unwrap_or(DEFAULT_POOL_SIZE))
        .connect(&addr)
        .await?;

    tracing::info!(hostname = %pg.address, "postgres connected");

    // execute migrations scripts on start.
    sqlx::migrate!().run(&pool).await?;

    let codes: Arc<dyn cache::CodeStore> = match &config.redis {
        Some(redis) => Arc::new(cache::RedisStore::new(&redis.url).await?),
        None => {
            tracing::warn!(
                "missing `redis` entry, codes are kept in process memory"
            );
            Arc::new(cache::MemoryStore::new())
        }
    };

    let Some(token_config) = &config.token else {
        tracing::error!("missing `token` entry on `config.yaml` file");
        std::process::exit(0);
    };
    let token = token::TokenManager::new(&config.name, &token_config.secret);

    let password = crypto::PasswordManager::new(config.argon2.clone())?;

    let mailer: Arc<dyn mail::Mailer> = match &config.mail {
        Some(cfg) => Arc::new(mail::SmtpMailer::new(cfg)?),
        None => {
            tracing::warn!("missing `mail` entry, outbound mail disabled");
            Arc::new(mail::NoopMailer)
        }
    };
    let queue_capacity = config.mail.as_ref().and_then(|m| m.queue_capacity);
    let (dispatcher, mail_worker) =
        mail::MailDispatcher::start(mailer, queue_capacity);

    let users: Arc<dyn user::UserStore> =
        Arc::new(user::PgUserStore::new(pool.clone()));
    let plants: Arc<dyn plant::PlantStore> =
        Arc::new(plant::PgPlantStore::new(pool.clone()));
    let cares: Arc<dyn care::CareStore> =
        Arc::new(care::PgCareStore::new(pool));

    let accounts = user::AccountService::new(
        Arc::clone(&users),
        Arc::clone(&codes),
        dispatcher,
        token.clone(),
        password,
    );

    Ok((
        AppState {
            config: Arc::new(config),
            token,
            accounts,
            users,
            plants,
            cares,
        },
        mail_worker,
    ))
}
