//! Webhook producer: an HTTP endpoint that turns JSON posts into requests.
//!
//! `POST /` with a JSON body is validated into `R` and emitted. `OPTIONS /`
//! answers CORS preflight. A body that fails to parse or validate gets a
//! `400` carrying the error message. Validators may be sync or async.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use futures::future::{self, BoxFuture};
use futures::{FutureExt, StreamExt};
use serde::de::DeserializeOwned;

use courier_core::error::{CourierError, Result};
use courier_core::traits::{Producer, RequestStream};
use courier_core::types::Payload;
use courier_scheduler::Channel;

type Validator<R> = Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<R>> + Send + Sync>;

const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "OPTIONS, POST"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

/// Shared state for the webhook routes.
struct WebhookState<R> {
    validator: Validator<R>,
    channel: Arc<Channel<R>>,
}

pub struct WebhookProducer<R: Payload> {
    name: String,
    addr: SocketAddr,
    validator: Validator<R>,
}

impl<R: Payload + DeserializeOwned> WebhookProducer<R> {
    /// Bodies are deserialized straight into `R`.
    pub fn new(addr: SocketAddr) -> Self {
        Self::with_validator(addr, |value| {
            serde_json::from_value(value).map_err(|e| CourierError::webhook(e.to_string()))
        })
    }
}

impl<R: Payload> WebhookProducer<R> {
    /// Custom validation: return an error to reject the body with a `400`.
    pub fn with_validator(
        addr: SocketAddr,
        validator: impl Fn(serde_json::Value) -> Result<R> + Send + Sync + 'static,
    ) -> Self {
        Self::with_async_validator(addr, move |value: serde_json::Value| future::ready(validator(value)))
    }

    /// Like [`with_validator`](Self::with_validator), for validation that
    /// has to await something (a lookup, a remote check).
    pub fn with_async_validator<F, Fut>(addr: SocketAddr, validator: F) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Self {
            name: "webhook".into(),
            addr,
            validator: Arc::new(move |value: serde_json::Value| validator(value).boxed()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Resolve `host:port` into a socket address.
    pub fn parse_addr(host: &str, port: u16) -> Result<SocketAddr> {
        format!("{host}:{port}")
            .parse()
            .map_err(|e| CourierError::config(format!("invalid webhook address {host}:{port}: {e}")))
    }

    /// The HTTP routes, pushing accepted bodies into `channel`.
    pub fn router(&self, channel: Arc<Channel<R>>) -> Router {
        let state = Arc::new(WebhookState {
            validator: Arc::clone(&self.validator),
            channel,
        });
        Router::new()
            .route("/", post(receive::<R>).options(preflight))
            .with_state(state)
    }
}

#[async_trait]
impl<R: Payload> Producer<R> for WebhookProducer<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<RequestStream<R>> {
        let channel = Arc::new(Channel::new());
        let app = self.router(Arc::clone(&channel));

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        let local = listener.local_addr()?;
        tracing::info!("🌐 [{}] Webhook server running at http://{local}", self.name);

        let name = self.name.clone();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("❌ [{name}] Webhook server stopped: {e}");
            }
        });

        Ok(Box::new(channel.stream().map(Ok::<R, CourierError>)))
    }
}

async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, CORS_HEADERS)
}

async fn receive<R: Payload>(State(state): State<Arc<WebhookState<R>>>, body: Bytes) -> Response {
    let parsed = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => (state.validator)(value).await,
        Err(e) => Err(CourierError::from(e)),
    };

    match parsed {
        Ok(requested) => {
            tracing::debug!("📥 Webhook accepted {:?}", requested);
            state.channel.push(requested);
            (StatusCode::OK, CORS_HEADERS, "OK").into_response()
        }
        Err(e) => {
            tracing::warn!("⚠️ Webhook rejected body: {e}");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}
