//! Application startup and lifecycle management.

use crate::config::NotifyRelayConfig;
use crate::handlers;
use crate::services::store::{self, RecipientStore};
use crate::services::{LinePushProvider, PushProvider, WeatherProvider, YahooWeatherProvider};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use relay_core::error::AppError;
use relay_core::middleware::{
    metrics_middleware, request_id_middleware, signature_validation_middleware, SignatureConfig,
    REQUEST_ID_HEADER,
};
use relay_core::utils::outbound_client;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Shared application state. Every outbound integration is a trait object so
/// tests can swap in the in-crate mocks.
#[derive(Clone)]
pub struct AppState {
    pub config: NotifyRelayConfig,
    pub store: Arc<dyn RecipientStore>,
    pub weather: Arc<dyn WeatherProvider>,
    pub push: Arc<dyn PushProvider>,
}

impl AppState {
    /// Wire the production integrations from configuration.
    pub async fn from_config(config: NotifyRelayConfig) -> Result<Self, AppError> {
        let client = outbound_client(config.http.outbound_timeout)?;

        let store = store::connect(&config.store, client.clone())
            .await
            .map_err(|e| {
                tracing::error!("Failed to initialize recipient store: {}", e);
                e
            })?;

        if !config.weather.is_configured() {
            tracing::warn!("Weather credentials missing; /notify will fail until they are set");
        }
        let weather: Arc<dyn WeatherProvider> = Arc::new(YahooWeatherProvider::new(
            client.clone(),
            config.weather.clone(),
        ));

        let push: Arc<dyn PushProvider> = Arc::new(LinePushProvider::new(
            client,
            &config.line.api_base_url,
            config.line.channel_access_token.clone(),
            config.dispatch.retry_max_elapsed,
        ));

        if config.arduino.recipient.is_none() {
            tracing::warn!("LINE_FALLBACK_RECIPIENT not set; /arduino will return an error");
        }

        Ok(Self {
            config,
            store,
            weather,
            push,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let signature = SignatureConfig::new(state.config.line.channel_secret.clone());
    if !signature.is_enabled() {
        tracing::warn!("LINE_CHANNEL_SECRET not set; webhook signatures are not verified");
    }

    let webhook_route = Router::new()
        .route("/webhook", post(handlers::receive_webhook))
        .route_layer(from_fn_with_state(
            signature,
            signature_validation_middleware,
        ));

    // Broadcasts and webhook batches run to completion; only the short
    // routes are cut off at the inbound timeout.
    let timed_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/arduino", post(handlers::notify_from_sensor))
        .layer(TimeoutLayer::new(state.config.http.inbound_timeout));

    Router::new()
        .route("/notify", post(handlers::notify_weather))
        .merge(webhook_route)
        .merge(timed_routes)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
}

type ServerFuture = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    server: ServerFuture,
}

impl Application {
    pub async fn build(config: NotifyRelayConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config).await?;
        Self::build_with_state(state).await
    }

    /// Bind and serve a prepared state. Port 0 picks a free port.
    pub async fn build_with_state(state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "notify-relay listening");

        let server = axum::serve(listener, build_router(state))
            .with_graceful_shutdown(shutdown_signal())
            .into_future();

        Ok(Self {
            port,
            server: Box::pin(server),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
