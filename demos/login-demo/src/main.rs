use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use gatehouse::{Gatehouse, GatehouseConfig};
use gatehouse_axum::{
    AuthError, ClientIdentifier, LiveSession, LoginRequest, MessageResponse, SessionResponse,
    clear_session, establish_session, layers,
};
use tracing::{info, warn};

const DEMO_EMAIL: &str = "demo@example.com";

struct AppState {
    gatehouse: Arc<Gatehouse>,
    demo_password: String,
}

type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,login_demo=debug,gatehouse_core=debug".into()),
        )
        .init();

    let config = GatehouseConfig::from_env();
    info!(environment = ?config.environment, "Starting gatehouse login demo");

    let gatehouse = Arc::new(
        Gatehouse::builder()
            .with_in_memory_store()
            .with_config(config)
            .build()?,
    );
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let maintenance = gatehouse.start_maintenance(shutdown_rx);

    let state = Arc::new(AppState {
        gatehouse: gatehouse.clone(),
        demo_password: std::env::var("DEMO_PASSWORD")
            .unwrap_or_else(|_| "correct horse".to_string()),
    });

    let layers = layers(gatehouse);
    let login = layers.limit_logins(
        Router::new().route("/login", get(login_page).post(login_handler)),
    );
    let app = layers
        .guard(
            Router::new()
                .route("/", get(index_handler))
                .route("/dashboard", get(dashboard_handler))
                .route("/logout", post(logout_handler))
                .merge(login),
        )
        .with_state(state);

    info!("Server starting on http://localhost:3000");
    info!("  GET  /           - Public page");
    info!("  GET  /login      - Login page (redirects home when signed in)");
    info!("  POST /login      - Sign in, rate limited per client and per email");
    info!("  GET  /dashboard  - Requires a live session");
    info!("  POST /logout     - Clear the session cookie");

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down");
    })
    .await?;

    let _ = shutdown_tx.send(true);
    maintenance.await?;
    Ok(())
}

async fn index_handler() -> &'static str {
    "Welcome! Sign in at /login"
}

async fn login_page() -> &'static str {
    "POST {\"email\": ..., \"password\": ...} to /login"
}

async fn login_handler(
    State(state): State<SharedState>,
    client: ClientIdentifier,
    headers: HeaderMap,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<MessageResponse>), AuthError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AuthError::BadRequest("email and password are required".to_string()));
    }

    let gatehouse: &Gatehouse = &state.gatehouse;

    let decision = gatehouse.check_rate_limit(&request.email).await?;
    if !decision.allowed {
        return Err(AuthError::RateLimited {
            retry_after: decision.retry_after_seconds().unwrap_or_default(),
        });
    }

    if request.email != DEMO_EMAIL || request.password != state.demo_password {
        warn!(email = %request.email, attempts = decision.attempts, "Login failed");
        return Err(AuthError::Unauthorized);
    }

    gatehouse.reset_rate_limit(&request.email).await?;
    gatehouse.reset_rate_limit(client.as_str()).await?;

    let (jar, _) = establish_session(gatehouse, &headers, jar)?;
    info!(email = %request.email, "Login succeeded");
    Ok((jar, Json(MessageResponse::new("Signed in"))))
}

async fn dashboard_handler(
    State(state): State<SharedState>,
    LiveSession(session): LiveSession,
) -> Json<SessionResponse> {
    Json(SessionResponse {
        last_activity: session.last_activity.timestamp_millis(),
        expires_in_secs: state.gatehouse.config().session.timeout.num_seconds(),
    })
}

async fn logout_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = clear_session(state.gatehouse.as_ref(), jar);
    (jar, Json(MessageResponse::new("Signed out")))
}
