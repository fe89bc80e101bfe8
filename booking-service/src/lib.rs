pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::{
    routing::{get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::middleware::{
    metrics::metrics_middleware, tracing::request_id_middleware,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{
    BookingReconciler, BookingRepository, CurrencyNormalizer, EventDispatcher, StripeClient,
};

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub config: Config,
    pub repository: BookingRepository,
    pub stripe: StripeClient,
    pub currency: CurrencyNormalizer,
    pub dispatcher: EventDispatcher,
    pub metrics: PrometheusHandle,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    db: mongodb::Database,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some("booking-service".to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let repository = BookingRepository::new(&db);

        // The unique payment-intent index must exist before any webhook is
        // handled; it is what makes duplicate deliveries safe.
        repository.init_indexes().await?;

        let stripe = StripeClient::new(config.stripe.clone());
        if stripe.is_configured() {
            tracing::info!("Stripe client initialized");
        } else {
            tracing::warn!("Stripe credentials not configured - payment features will be limited");
        }

        let currency = CurrencyNormalizer::new(&config.currency);
        let dispatcher = EventDispatcher::new(BookingReconciler::new(repository.clone()));
        let metrics = services::metrics::prometheus_handle();

        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            repository,
            stripe,
            currency,
            dispatcher,
            metrics,
        };

        let protected = Router::new()
            .route(
                "/payments/create-payment-intent",
                post(handlers::payments::create_payment_intent),
            )
            .route(
                "/payments/payment-intent/:id",
                get(handlers::payments::get_payment_intent),
            )
            .route(
                "/bookings",
                get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
            )
            .route("/bookings/:id", get(handlers::bookings::get_booking))
            .route(
                "/bookings/:id/status",
                patch(handlers::bookings::update_booking_status),
            )
            .layer(from_fn_with_state(
                state.clone(),
                middleware::auth_middleware,
            ));

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics))
            .route(
                "/payments/publishable-key",
                get(handlers::payments::publishable_key),
            )
            // Webhook authenticity comes from the payload signature, not
            // bearer auth; it must stay outside the auth middleware.
            .route("/payments/webhook", post(handlers::payments::webhook))
            .merge(protected)
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(CorsLayer::permissive())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        // Port 0 binds a random free port, used by the test harness.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
            db,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &mongodb::Database {
        &self.db
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
