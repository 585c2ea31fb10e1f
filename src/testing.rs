//! Helpers for driving the full router in tests without a database.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::jwt::JwtKeys,
    config::AppConfig,
    mailer::RecordingMailer,
    seed::load_initial_data,
    state::AppState,
    store::{MemoryStore, Store},
    users::repo_types::User,
};

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<dyn Store>,
    pub mailer: Arc<RecordingMailer>,
    pub admin: User,
}

impl TestApp {
    /// Seeded in-memory application with the test administrator.
    pub async fn new() -> Self {
        let config = Arc::new(AppConfig::for_tests());
        let store: Arc<dyn Store> = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());

        let data = load_initial_data(store.as_ref(), &config).await.unwrap();
        let admin = data.admin.unwrap();

        let state = AppState::from_parts(store.clone(), mailer.clone(), config);
        Self {
            app: build_app(state.clone()),
            state,
            store,
            mailer,
            admin,
        }
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        JwtKeys::from(&self.state.config.jwt)
            .sign_access(user_id)
            .unwrap()
    }

    pub fn admin_token(&self) -> String {
        self.token_for(self.admin.id)
    }
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<String>,
) -> Response {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = req.body(body.map(Body::from).unwrap_or_else(Body::empty)).unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_bytes(res: Response) -> Vec<u8> {
    to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(res: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}
