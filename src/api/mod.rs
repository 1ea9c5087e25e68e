//! HTTP API server for the tweetgen gateway

pub mod generate;
pub mod health;
pub mod images;
pub mod posts;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, StorageBackend};
use crate::generation::Generator;
use crate::history::ConversationStore;
use crate::images::{DEFAULT_DELETE_DELAY, ImageGenerator, ImagePipeline, PollinationsClient};
use crate::llm::{ChatModel, OpenRouterClient};
use crate::social::{HttpPublisher, PostPublisher, PostingProxy};
use crate::storage::{InMemoryStore, ObjectStore, S3Store, S3StoreConfig};
use crate::{Error, Result};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub generator: Generator,
    pub images: ImagePipeline,
    pub posting: PostingProxy,
    pub memory: ConversationStore,
}

/// Error returned by API handlers
///
/// Every variant renders as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Required request header absent
    MissingHeader(&'static str),
    /// Request body missing, malformed or of the wrong shape
    InvalidBody(JsonRejection),
    /// Any failure inside the gateway or its upstreams
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Internal(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, error) = match self {
            Self::MissingHeader(name) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("missing required header: {name}"),
            ),
            Self::InvalidBody(rejection) => (rejection.status(), rejection.body_text()),
            Self::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// JSON body extractor whose rejections render as [`ApiError`]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    store: Arc<dyn ObjectStore>,
    port: u16,
    chat_model: Option<Arc<dyn ChatModel>>,
    image_generator: Option<Arc<dyn ImageGenerator>>,
    publisher: Option<Arc<dyn PostPublisher>>,
    image_bucket: String,
    chat_bucket: String,
    public_base_url: Option<String>,
    delete_delay: Duration,
    allowed_origins: Vec<String>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, port: u16) -> Self {
        Self {
            store,
            port,
            chat_model: None,
            image_generator: None,
            publisher: None,
            image_bucket: "tweet-images".to_string(),
            chat_bucket: "chat-memory".to_string(),
            public_base_url: None,
            delete_delay: DEFAULT_DELETE_DELAY,
            allowed_origins: vec!["*".to_string()],
        }
    }

    /// Wire every client from configuration
    ///
    /// Services whose credentials are missing are left unset; their
    /// endpoints answer with a configuration error.
    ///
    /// # Errors
    ///
    /// Returns error if the object store endpoint is invalid
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match config.storage.backend {
            StorageBackend::S3 => Arc::new(S3Store::new(S3StoreConfig {
                endpoint: config.storage.endpoint.clone(),
                access_key: config.storage.access_key.clone(),
                secret_key: config.storage.secret_key.clone(),
                region: config.storage.region.clone(),
                secure: config.storage.secure,
            })?),
            StorageBackend::Memory => {
                tracing::warn!("using in-memory object store, data is lost on restart");
                Arc::new(InMemoryStore::new())
            }
        };

        let mut builder = Self::new(store, config.server.port)
            .buckets(
                config.storage.image_bucket.clone(),
                config.storage.chat_bucket.clone(),
            )
            .public_base_url(config.storage.public_url.clone())
            .delete_delay(config.image.delete_delay)
            .allowed_origins(config.server.allowed_origins.clone());

        match (&config.llm.api_key, &config.llm.model) {
            (Some(key), Some(model)) => {
                builder = builder.chat_model(Arc::new(OpenRouterClient::new(
                    key.clone(),
                    model.clone(),
                    config.llm.base_url.clone(),
                )));
            }
            _ => tracing::warn!("OPENROUTER_API_KEY or OPENROUTER_MODEL not set, /generate disabled"),
        }

        match &config.image.api_key {
            Some(key) => {
                builder = builder.image_generator(Arc::new(PollinationsClient::new(
                    key.clone(),
                    config.image.base_url.clone(),
                    config.image.width,
                    config.image.height,
                )));
            }
            None => tracing::warn!("IMAGE_API_KEY not set, /generate_image disabled"),
        }

        match &config.social.endpoint {
            Some(endpoint) => {
                builder = builder.publisher(Arc::new(HttpPublisher::new(endpoint.clone())));
            }
            None => tracing::warn!("TWEET_API_URL not set, /post_tweet disabled"),
        }

        Ok(builder)
    }

    /// Set the language model
    #[must_use]
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Set the image generator
    #[must_use]
    pub fn image_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.image_generator = Some(generator);
        self
    }

    /// Set the social service publisher
    #[must_use]
    pub fn publisher(mut self, publisher: Arc<dyn PostPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Set the image and chat memory bucket names
    #[must_use]
    pub fn buckets(mut self, image_bucket: String, chat_bucket: String) -> Self {
        self.image_bucket = image_bucket;
        self.chat_bucket = chat_bucket;
        self
    }

    /// Set the public base URL for image links
    #[must_use]
    pub fn public_base_url(mut self, url: Option<String>) -> Self {
        self.public_base_url = url;
        self
    }

    /// Set how long generated images are kept
    #[must_use]
    pub const fn delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }

    /// Set the allowed CORS origins (`*` allows any)
    #[must_use]
    pub fn allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let memory = ConversationStore::new(self.store.clone(), self.chat_bucket.clone());
        let generator = Generator::new(self.chat_model, memory.clone());
        let images = ImagePipeline::new(
            self.image_generator,
            self.store.clone(),
            memory.clone(),
            self.image_bucket.clone(),
        )
        .public_base_url(self.public_base_url)
        .delete_delay(self.delete_delay);
        let posting = PostingProxy::new(self.publisher, self.store.clone(), self.image_bucket.clone());

        let state = Arc::new(ApiState {
            generator,
            images,
            posting,
            memory,
        });

        ApiServer {
            state,
            store: self.store,
            buckets: [self.image_bucket, self.chat_bucket],
            port: self.port,
            allowed_origins: self.allowed_origins,
        }
    }
}

/// Build the CORS layer for the configured origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(values))
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    store: Arc<dyn ObjectStore>,
    buckets: [String; 2],
    port: u16,
    allowed_origins: Vec<String>,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        Router::new()
            .merge(generate::router(self.state.clone()))
            .merge(images::router(self.state.clone()))
            .merge(posts::router(self.state.clone()))
            .merge(health::router(self.state.clone()))
            .layer(cors_layer(&self.allowed_origins))
            .layer(TraceLayer::new_for_http())
    }

    /// Create the image and chat buckets if missing
    ///
    /// Failures are logged; requests will surface storage errors later.
    pub async fn prepare_storage(&self) {
        for bucket in &self.buckets {
            if let Err(e) = self.store.ensure_bucket(bucket).await {
                tracing::warn!(
                    backend = self.store.name(),
                    bucket = %bucket,
                    error = %e,
                    "could not ensure bucket exists"
                );
            }
        }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        self.prepare_storage().await;

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, backend = self.store.name(), "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutdown signal received");
                }
            })
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}
