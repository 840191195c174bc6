use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::config::Config;
use crate::controllers::AppState;
use crate::game::GameState;
use crate::migrations::Migrator;
use crate::openapi::ApiDoc;
use crate::routing;

const API_DOCS_PATH: &str = "/api-docs";
const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// The Magitech session server.
pub struct App {
    pub config: Config,
    pub db: DatabaseConnection,
    pub game: Arc<GameState>,
}

impl App {
    /// Build the application from environment configuration.
    ///
    /// `--migrate` and `--rollback [n]` on the command line run the
    /// migration and exit the process.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::from_env()?;
        let db = crate::db::connect(&config).await?;

        Self::handle_db_cli_args(&db).await?;

        Self::from_parts(config, db).await
    }

    /// Build the application with a given config.
    pub async fn with_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let db = crate::db::connect(&config).await?;
        Self::from_parts(config, db).await
    }

    async fn from_parts(
        config: Config,
        db: DatabaseConnection,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        tracing::info!("Running pending database migrations...");
        Migrator::up(&db, None).await?;
        tracing::info!("Migrations complete.");

        let game = Arc::new(GameState::new(config.game.clone()));
        Ok(App { config, db, game })
    }

    async fn handle_db_cli_args(db: &DatabaseConnection) -> Result<(), Box<dyn std::error::Error>> {
        let args: Vec<String> = std::env::args().collect();

        if args.iter().any(|a| a == "--migrate") {
            tracing::info!("Running pending database migrations...");
            Migrator::up(db, None).await?;
            tracing::info!("Migrations complete.");
            std::process::exit(0);
        }

        if let Some(pos) = args.iter().position(|arg| arg == "--rollback") {
            let steps = args
                .get(pos + 1)
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(1);
            tracing::info!("Rolling back {} migration(s)...", steps);
            Migrator::down(db, Some(steps)).await?;
            tracing::info!("Rollback complete.");
            std::process::exit(0);
        }

        Ok(())
    }

    /// Build the Axum router: API routes, docs, and middleware.
    pub fn router(&self) -> Router {
        let config = Arc::new(self.config.clone());
        let is_dev = self.config.is_dev();

        let state = AppState {
            db: self.db.clone(),
            config: config.clone(),
            game: self.game.clone(),
        };

        let openapi_spec = ApiDoc::openapi();
        let openapi_json = openapi_spec.clone();

        let mut router = Router::new()
            .route("/", get(welcome))
            .merge(routing::build_routes().with_state(state))
            .merge(Scalar::with_url(API_DOCS_PATH, openapi_spec))
            .route(
                OPENAPI_JSON_PATH,
                get(move || {
                    let spec = openapi_json.clone();
                    async move { axum::Json(spec) }
                }),
            )
            .layer(axum::Extension(config))
            .layer(CorsLayer::permissive());

        if is_dev {
            use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse};
            use tower_http::LatencyUnit;

            let x_request_id = axum::http::HeaderName::from_static("x-request-id");
            router = router
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                        .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                        .on_response(
                            DefaultOnResponse::new()
                                .level(tracing::Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        ),
                );
        }

        router
    }

    /// Serve until Ctrl+C.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.server_addr();
        let router = self.router();

        println!("\nMagitech server is running!");
        println!("   → Server:   http://{}", addr);
        println!("   → API docs: http://{}{}", addr, API_DOCS_PATH);
        println!();

        tracing::info!(
            "Magitech server running on http://{} (enemy turn delay {:?})",
            addr,
            self.config.game.enemy_turn_delay()
        );

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down Magitech server...");
}

#[derive(Serialize)]
struct WelcomeMessage {
    message: &'static str,
    docs: &'static str,
    status: &'static str,
    version: &'static str,
}

/// Welcome page at `/`.
async fn welcome() -> impl IntoResponse {
    axum::Json(WelcomeMessage {
        message: "Welcome to the Magitech RPG server",
        docs: API_DOCS_PATH,
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
    })
}
