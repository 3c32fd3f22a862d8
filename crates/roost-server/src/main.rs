use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post, put},
};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use roost_api::middleware::require_access;
use roost_api::{AppState, AppStateInner, accounts, auth, messages, webhooks};
use roost_auth::TokenManager;
use roost_db::Store;

/// File-backed message board service.
#[derive(Parser)]
#[command(name = "roost", version)]
struct Cli {
    /// Wipe the database before starting. Test/debug environments only.
    #[arg(long)]
    debug: bool,
}

struct Config {
    jwt_secret: String,
    webhook_key: String,
    db_path: PathBuf,
    serve_dir: PathBuf,
    host: String,
    port: u16,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            jwt_secret: std::env::var("ROOST_JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me".into()),
            webhook_key: std::env::var("ROOST_WEBHOOK_KEY")
                .unwrap_or_else(|_| "dev-webhook-key".into()),
            db_path: std::env::var("ROOST_DB_PATH")
                .unwrap_or_else(|_| "roost.json".into())
                .into(),
            serve_dir: std::env::var("ROOST_SERVE_DIR")
                .unwrap_or_else(|_| ".".into())
                .into(),
            host: std::env::var("ROOST_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("ROOST_PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
        })
    }
}

/// Binary-level state: the API state plus the static-file hit counter.
#[derive(Clone)]
struct ServerState {
    hits: Arc<AtomicU64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roost=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init store
    let store = Arc::new(Store::open(&config.db_path)?);
    if cli.debug {
        store.reset()?;
        info!("debug mode: database wiped");
    }

    // Shared state
    let tokens = Arc::new(TokenManager::new(&config.jwt_secret, store.clone()));
    let app_state: AppState = Arc::new(AppStateInner::new(
        store,
        tokens,
        config.webhook_key.clone(),
    ));
    let server_state = ServerState {
        hits: Arc::new(AtomicU64::new(0)),
    };

    // Routes
    let public_api = Router::new()
        .route("/healthz", get(healthz))
        .route("/accounts", post(accounts::post_account))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/revoke", post(auth::revoke))
        .route("/messages", get(messages::get_messages))
        .route("/messages/{id}", get(messages::get_message))
        .route("/webhooks", post(webhooks::post_webhook))
        .with_state(app_state.clone());

    let protected_api = Router::new()
        .route("/messages", post(messages::post_message))
        .route("/messages/{id}", delete(messages::delete_message))
        .route("/accounts", put(accounts::put_account))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_access,
        ))
        .with_state(app_state);

    let reset_route = Router::new()
        .route("/reset", get(reset_hits))
        .with_state(server_state.clone());

    let admin = Router::new()
        .route("/metrics", get(metrics_page))
        .with_state(server_state.clone());

    let static_files = Router::new()
        .fallback_service(ServeDir::new(&config.serve_dir))
        .layer(middleware::from_fn_with_state(
            server_state.clone(),
            count_hits,
        ));

    let app = Router::new()
        .nest("/api", public_api.merge(protected_api).merge(reset_route))
        .nest("/admin", admin)
        .nest_service("/app", static_files)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        "serving files from {} on {}",
        config.serve_dir.display(),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "OK"
}

async fn count_hits(State(state): State<ServerState>, req: Request, next: Next) -> Response {
    state.hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}

async fn metrics_page(State(state): State<ServerState>) -> impl IntoResponse {
    let hits = state.hits.load(Ordering::Relaxed);
    Html(format!(
        "<html>\n<body>\n<h1>Welcome, Roost Admin</h1>\n<p>Roost has been visited {hits} times!</p>\n</body>\n</html>\n"
    ))
}

async fn reset_hits(State(state): State<ServerState>) -> &'static str {
    state.hits.store(0, Ordering::Relaxed);
    "Hits reset to 0"
}
