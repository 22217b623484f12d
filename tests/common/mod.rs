use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    middleware, Router,
};
use serde_json::Value;
use storeroom_api::{
    auth::{self, AuthConfig, AuthService, Role, SignupRequest},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    middleware_helpers::request_id_middleware,
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Full-application harness backed by a throwaway SQLite file database.
///
/// The pool is capped at a single connection so concurrent transactions
/// serialize deterministically, which is what the concurrency tests rely on.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin_id: Uuid,
    pub user_id: Uuid,
    admin_token: String,
    user_token: String,
    auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
    _tmp: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir for test database");
        let db_path = tmp.path().join("storeroom_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_cfg = AuthConfig::from_app_config(&cfg);
        let auth_service = Arc::new(AuthService::new(
            auth_cfg,
            db_arc.clone(),
            Some(event_sender.clone()),
        ));

        let admin = auth_service
            .register(SignupRequest {
                name: "Admin".to_string(),
                email: "admin@example.com".to_string(),
                password: "admin-password".to_string(),
                role: Role::Admin,
            })
            .await
            .expect("seed admin account");
        let user = auth_service
            .register(SignupRequest {
                name: "Regular User".to_string(),
                email: "user@example.com".to_string(),
                password: "user-password".to_string(),
                role: Role::User,
            })
            .await
            .expect("seed user account");

        let admin_token = auth_service
            .generate_token(&admin)
            .expect("admin token")
            .access_token;
        let user_token = auth_service
            .generate_token(&user)
            .expect("user token")
            .access_token;

        let services = AppServices::new(db_arc.clone(), Some(event_sender));

        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", storeroom_api::api_v1_routes())
            .nest(
                "/api/v1/auth",
                auth::auth_routes().with_state(auth_service.clone()),
            )
            .layer(middleware::from_fn_with_state(
                auth_service.clone(),
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .layer(middleware::from_fn(request_id_middleware))
            .with_state(state.clone());

        Self {
            router,
            state,
            admin_id: admin.id,
            user_id: user.id,
            admin_token,
            user_token,
            auth_service,
            _event_task: event_task,
            _tmp: tmp,
        }
    }

    #[allow(dead_code)]
    pub fn auth_service(&self) -> Arc<AuthService> {
        self.auth_service.clone()
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn user_token(&self) -> &str {
        &self.user_token
    }

    /// A router clone suitable for moving into spawned tasks.
    #[allow(dead_code)]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for admin-authenticated JSON requests.
    pub async fn request_as_admin(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.admin_token()))
            .await
    }

    /// Convenience helper for user-authenticated JSON requests.
    pub async fn request_as_user(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.user_token()))
            .await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Read a response body as JSON.
pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is valid json")
}
