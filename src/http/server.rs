//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every handler and route gate
//! - Wire the request pipeline in its fixed order
//! - Bind the server to a listener and purge expired sessions
//!
//! # Data Flow
//! ```text
//! request
//!     → trace → security headers → authenticate → audit start
//!     → panic guard → timeout → body limit → rate limit → content type
//!     → route gate (authenticated? / permission?) → handler
//!     → audit end → security headers → response
//! ```
//!
//! # Design Decisions
//! - Security headers sit outside everything so rejections carry them too
//! - Authentication precedes the audit start so records name the subject
//! - Rate limiting follows the audit start, so throttled requests are
//!   still recorded as a start/end pair
//! - Unknown routes and unsupported methods both answer 404

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::Method,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{delete, get, post, MethodRouter},
    Router,
};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::{timeout::error::Elapsed, BoxError, ServiceBuilder};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::access::{
    authenticate, enforce_permission, require_authentication, require_permission, Authenticator,
    Permissions,
};
use crate::api::{logs, messages, sessions, spaces, users};
use crate::audit::{audit_requests, AuditLog, AuditSink};
use crate::clock::Clock;
use crate::config::NatterConfig;
use crate::error::ApiError;
use crate::security::{admission_control, harden_response, require_json, RateLimiter};
use crate::session::{MemoryTokenStore, TokenStore};
use crate::store::{MemoryStore, PermissionStore, SpaceStore, UserStore};

/// The shared stores behind the pipeline and the handlers.
#[derive(Clone)]
pub struct Stores {
    pub spaces: Arc<dyn SpaceStore>,
    pub grants: Arc<dyn PermissionStore>,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
}

impl Stores {
    /// Every store held in process memory.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            spaces: store.clone(),
            grants: store.clone(),
            users: store,
            tokens: Arc::new(MemoryTokenStore::new(clock)),
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<NatterConfig>,
    pub spaces: Arc<dyn SpaceStore>,
    pub grants: Arc<dyn PermissionStore>,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub limiter: Arc<RateLimiter>,
    pub audit: AuditLog,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        config: NatterConfig,
        clock: Arc<dyn Clock>,
        stores: Stores,
        limiter: Arc<RateLimiter>,
        audit: AuditLog,
    ) -> Self {
        Self {
            config: Arc::new(config),
            spaces: stores.spaces,
            grants: stores.grants,
            users: stores.users,
            tokens: stores.tokens,
            limiter,
            audit,
            clock,
        }
    }

    /// In-memory stores and a limiter built from `config.rate_limit`.
    pub fn in_memory(config: NatterConfig, clock: Arc<dyn Clock>, audit_sink: Arc<dyn AuditSink>) -> Self {
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit, clock.clone()));
        let audit = AuditLog::new(audit_sink, clock.clone());
        Self::new(config, clock.clone(), Stores::in_memory(clock), limiter, audit)
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let authenticator = Authenticator::new(
        state.tokens.clone(),
        state.users.clone(),
        state.config.session.cookie_name.clone(),
    );
    let grants = state.grants.clone();
    let gated = |route: MethodRouter<AppState>, method: Method, required: Permissions| {
        route.route_layer(from_fn_with_state(
            require_permission(grants.clone(), method, required),
            enforce_permission,
        ))
    };
    let authenticated = |route: MethodRouter<AppState>| route.route_layer(from_fn(require_authentication));

    let pipeline = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(harden_response))
        .layer(from_fn_with_state(authenticator, authenticate))
        .layer(from_fn_with_state(state.audit.clone(), audit_requests))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(HandleErrorLayer::new(request_failed))
        .timeout(Duration::from_secs(state.config.timeouts.request_secs))
        .layer(DefaultBodyLimit::max(state.config.limits.max_body_bytes))
        .layer(from_fn_with_state(state.limiter.clone(), admission_control))
        .layer(from_fn(require_json));

    Router::new()
        .route("/users", post(users::register_user))
        .route(
            "/sessions",
            authenticated(post(sessions::login).delete(sessions::logout)),
        )
        .route("/logs", authenticated(get(logs::read_audit_log)))
        .route("/spaces", authenticated(post(spaces::create_space)))
        .route(
            "/spaces/{space_id}/members",
            gated(post(spaces::add_member), Method::POST, Permissions::ALL),
        )
        .route(
            "/spaces/{space_id}/messages",
            gated(post(messages::create_message), Method::POST, Permissions::WRITE).merge(gated(
                get(messages::list_messages),
                Method::GET,
                Permissions::READ,
            )),
        )
        .route(
            "/spaces/{space_id}/messages/{msg_id}",
            gated(get(messages::read_message), Method::GET, Permissions::READ).merge(gated(
                delete(messages::delete_message),
                Method::DELETE,
                Permissions::DELETE,
            )),
        )
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .with_state(state)
        .layer(pipeline)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Error from the timeout stage, in the JSON envelope.
async fn request_failed(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Internal(format!("unhandled middleware error: {err}"))
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

/// HTTP server for the Natter API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server around prepared state.
    pub fn from_state(state: AppState) -> Self {
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let purge = tokio::spawn(purge_expired_sessions(
            self.state.tokens.clone(),
            Duration::from_secs(self.state.config.session.purge_interval_secs),
        ));

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;

        purge.abort();
        tracing::info!("HTTP server stopped");
        result
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

async fn purge_expired_sessions(tokens: Arc<dyn TokenStore>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let purged = tokens.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "Expired session tokens purged");
        }
    }
}

/// Wait for Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
