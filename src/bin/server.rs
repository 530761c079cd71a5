use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use herdwatch_server::analyzer::{RemoteAnalyzer, StubAnalyzer, VideoAnalyzer};
use herdwatch_server::locks::AnimalLocks;
use herdwatch_server::notify::ChangeBroadcaster;
use herdwatch_server::storage::{VideoStore, MAX_VIDEO_BYTES};
use herdwatch_server::{api, migrator};
use sea_orm::{Database, DatabaseConnection};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    herdwatch_server::telemetry::init_telemetry("herdwatch-server");

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let redis_client = redis::Client::open(redis_url).expect("Invalid Redis URL");

    let gcs_config = google_cloud_storage::client::ClientConfig::default()
        .with_auth()
        .await
        .expect("Failed to configure GCS client");
    let gcs_client = google_cloud_storage::client::Client::new(gcs_config);
    let bucket = std::env::var("GCS_BUCKET_NAME").expect("GCS_BUCKET_NAME must be set");

    use sea_orm_migration::MigratorTrait;
    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    herdwatch_server::metrics::init_metrics(&db).await;

    // ANALYZER_URL switches to a real analysis service; default is the stub
    let analyzer: Arc<dyn VideoAnalyzer> = match std::env::var("ANALYZER_URL") {
        Ok(endpoint) => {
            tracing::info!("using remote analyzer at {}", endpoint);
            Arc::new(RemoteAnalyzer::new(endpoint))
        }
        Err(_) => Arc::new(StubAnalyzer::from_env()),
    };

    let broadcaster = Arc::new(ChangeBroadcaster::new(redis_client.clone()));
    let locks = Arc::new(AnimalLocks::new());
    let store = Arc::new(VideoStore::new(gcs_client, bucket));

    let app = app(db, analyzer, broadcaster, locks, store, prometheus_layer, metric_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8000));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("server error");
}

async fn health_check() -> &'static str {
    "OK"
}

fn app(
    db: DatabaseConnection,
    analyzer: Arc<dyn VideoAnalyzer>,
    broadcaster: Arc<ChangeBroadcaster>,
    locks: Arc<AnimalLocks>,
    store: Arc<VideoStore>,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(api::auth::register))
        .route("/login", post(api::auth::login));

    let protected_routes = Router::new()
        .route(
            "/animals",
            get(api::animal::list_animals).post(api::animal::create_animal),
        )
        .route(
            "/animals/:id",
            get(api::animal::get_animal)
                .patch(api::animal::update_animal)
                .delete(api::animal::delete_animal),
        )
        .route("/animals/:id/alerts", get(api::alerts::list_animal_alerts))
        .route("/animals/:id/analyses", get(api::analysis::list_animal_analyses))
        .route("/animals/:id/analyze", post(api::analysis::analyze_animal))
        .route("/alerts", get(api::alerts::list_alerts))
        .route("/alerts/:id", get(api::alerts::get_alert))
        .route("/alerts/:id/resolve", post(api::alerts::resolve_alert))
        .route("/analyses", get(api::analysis::list_analyses))
        .route("/internal/analyze", post(api::analysis::internal_analyze))
        .route("/dashboard/stats", get(api::dashboard::stats))
        .route("/events/:table", get(api::events::subscribe))
        .route_layer(axum::middleware::from_fn(api::middleware::auth_middleware));

    let frontend_origin =
        std::env::var("FRONTEND_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(Extension(db))
        .layer(Extension(analyzer))
        .layer(Extension(broadcaster))
        .layer(Extension(locks))
        .layer(Extension(store))
        .layer(tower_cookies::CookieManagerLayer::new())
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        // Filled in by handlers
                        user_id = tracing::field::Empty,
                        animal_id = tracing::field::Empty,
                        alert_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(
                    |_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {},
                )
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(
                    frontend_origin
                        .parse::<axum::http::HeaderValue>()
                        .expect("FRONTEND_ORIGIN must be a valid origin"),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_VIDEO_BYTES))
}
