//! Shared test utilities

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use tower::ServiceExt;
use tweetgen_gateway::llm::ChatMessage;
use tweetgen_gateway::storage::ObjectInfo;
use tweetgen_gateway::{
    ApiServerBuilder, ChatModel, Error, ImageGenerator, InMemoryStore, ObjectStore, Post,
    PostPublisher, Result,
};

pub const IMAGE_BUCKET: &str = "test-images";
pub const CHAT_BUCKET: &str = "test-chat";

/// Chat model returning canned replies and recording every call
#[derive(Default)]
pub struct FakeChatModel {
    pub reply: String,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
}

#[async_trait]
impl ChatModel for FakeChatModel {
    async fn complete(&self, messages: &[ChatMessage], _temperature: f64) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(messages.to_vec());
        if self.reply.is_empty() {
            return Err(Error::Generation("model unavailable".to_string()));
        }
        Ok(self.reply.clone())
    }

    fn model_id(&self) -> &str {
        "fake-model"
    }
}

/// Image generator returning a fixed payload
pub struct FakeImageGenerator;

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Publisher that records posts, optionally rejecting them
#[derive(Default)]
pub struct FakePublisher {
    pub reject: bool,
    pub posts: Mutex<Vec<(Post, String)>>,
}

#[async_trait]
impl PostPublisher for FakePublisher {
    async fn publish(&self, post: &Post, api_key: &str) -> Result<()> {
        if self.reject {
            return Err(Error::Upstream("Invalid API key".to_string()));
        }
        self.posts
            .lock()
            .unwrap()
            .push((post.clone(), api_key.to_string()));
        Ok(())
    }
}

/// Object store whose every operation fails, like an unreachable server
pub struct FailingStore;

fn unavailable() -> Error {
    Error::Storage("connection refused".to_string())
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn ensure_bucket(&self, _bucket: &str) -> Result<()> {
        Err(unavailable())
    }

    async fn put_object(
        &self,
        _bucket: &str,
        _key: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        Err(unavailable())
    }

    async fn get_object(&self, _bucket: &str, _key: &str) -> Result<Vec<u8>> {
        Err(unavailable())
    }

    async fn stat_object(&self, _bucket: &str, _key: &str) -> Result<ObjectInfo> {
        Err(unavailable())
    }

    async fn delete_object(&self, _bucket: &str, _key: &str) -> Result<()> {
        Err(unavailable())
    }

    async fn list_objects(&self, _bucket: &str) -> Result<Vec<ObjectInfo>> {
        Err(unavailable())
    }

    async fn presigned_get_url(
        &self,
        _bucket: &str,
        _key: &str,
        _expires: Duration,
    ) -> Result<String> {
        Err(unavailable())
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Build a fully wired router whose object store is down
pub fn failing_store_app(reply: &str) -> (Router, Arc<FakeChatModel>) {
    let model = Arc::new(FakeChatModel {
        reply: reply.to_string(),
        ..FakeChatModel::default()
    });
    let router = ApiServerBuilder::new(Arc::new(FailingStore), 0)
        .chat_model(model.clone())
        .image_generator(Arc::new(FakeImageGenerator))
        .publisher(Arc::new(FakePublisher::default()))
        .build()
        .router();
    (router, model)
}

/// Everything a test needs to drive the router and inspect side effects
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub model: Arc<FakeChatModel>,
    pub publisher: Arc<FakePublisher>,
}

/// Build a fully wired router over an in-memory store
pub fn test_app(reply: &str) -> TestApp {
    build_app(reply, FakePublisher::default())
}

/// Build a router whose publisher rejects every post
pub fn test_app_rejecting() -> TestApp {
    build_app(
        "reply",
        FakePublisher {
            reject: true,
            ..FakePublisher::default()
        },
    )
}

fn build_app(reply: &str, publisher: FakePublisher) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let model = Arc::new(FakeChatModel {
        reply: reply.to_string(),
        ..FakeChatModel::default()
    });
    let publisher = Arc::new(publisher);

    let server = ApiServerBuilder::new(store.clone(), 0)
        .buckets(IMAGE_BUCKET.to_string(), CHAT_BUCKET.to_string())
        .chat_model(model.clone())
        .image_generator(Arc::new(FakeImageGenerator))
        .publisher(publisher.clone())
        .build();

    TestApp {
        router: server.router(),
        store,
        model,
        publisher,
    }
}

/// Build a router with no upstream services configured
pub fn unconfigured_app() -> Router {
    ApiServerBuilder::new(Arc::new(InMemoryStore::new()), 0)
        .build()
        .router()
}

/// Send a JSON request
pub async fn send_json(
    router: &Router,
    method: &str,
    uri: &str,
    body: &serde_json::Value,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    router
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Send a POST with a raw JSON-typed body
pub async fn send_raw(router: &Router, uri: &str, body: &'static str) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Send a GET request
pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Read a response body as JSON
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
