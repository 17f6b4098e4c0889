use eyre::Result;
use memry_client::auth::AuthSessionManager;
use memry_client::cache::SecureAuthCache;
use memry_client::database::Database;
use memry_client::domain::Lecture;
use memry_client::net::{ConnectivityProbe, LinkState, NetworkMonitor};
use memry_client::retry::RetryPolicy;
use memry_client::settings::Settings;
use memry_client::sync::SyncCoordinator;
use memry_client::uploader::AssetUploader;
use memry_common::api::{ListLecturesResponse, SessionResponse, UserResponse};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Probe returning a fixed snapshot; transitions are injected through
/// `NetworkMonitor::report` instead.
pub struct StaticProbe(pub LinkState);

#[async_trait::async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn snapshot(&self) -> LinkState {
        self.0
    }
}

/// A full client wired against a mock backend in a scratch directory.
pub struct TestApp {
    pub server: MockServer,
    pub settings: Settings,
    pub db: Arc<Database>,
    pub cache: SecureAuthCache,
    pub monitor: Arc<NetworkMonitor>,
    pub coordinator: Arc<SyncCoordinator>,
    pub auth: AuthSessionManager,
    _dir: tempfile::TempDir,
}

pub async fn spawn_app(initial: LinkState) -> Result<TestApp> {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new()?;
    let path_of = |name: &str| dir.path().join(name).to_str().unwrap().to_string();

    let settings = Settings {
        db_path: path_of("lectures.db"),
        key_path: path_of("key"),
        session_path: path_of("session"),
        auth_cache_path: path_of("auth_cache"),
        server_address: server.uri(),
    };

    let monitor = Arc::new(NetworkMonitor::new(Arc::new(StaticProbe(initial))).await);
    let db = Arc::new(Database::new(&settings.db_path).await?);
    let uploader = AssetUploader::with_policy(RetryPolicy::new(3, Duration::from_millis(10)));
    let coordinator = Arc::new(SyncCoordinator::new(db.clone(), uploader));
    let cache = SecureAuthCache::new(&settings);
    let auth = AuthSessionManager::new(
        settings.clone(),
        SecureAuthCache::new(&settings),
        monitor.clone(),
        coordinator.clone(),
    );

    Ok(TestApp {
        server,
        settings,
        db,
        cache,
        monitor,
        coordinator,
        auth,
        _dir: dir,
    })
}

pub fn some_user(authorized: bool) -> UserResponse {
    UserResponse {
        id: Uuid::new_v4(),
        email: "ada@example.com".into(),
        authorized,
    }
}

pub async fn mount_session(server: &MockServer, user: &UserResponse) {
    let body = SessionResponse {
        user: user.clone(),
        expires_at: time::OffsetDateTime::now_utc() + Duration::from_secs(3600),
    };
    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_session_rejected(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;
}

/// Empty happy-path mocks for every route a full sync sequence touches.
/// Tests override individual routes by mounting more specific mocks first.
pub async fn mount_empty_sync_routes(server: &MockServer) {
    mount_lectures(server, &[]).await;
    Mock::given(method("GET"))
        .and(path("/filters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "filters": [] })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/preferences"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "preferences": {} })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lectures/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "lectures": [] })),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/lectures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .mount(server)
        .await;
}

pub async fn mount_lectures(server: &MockServer, lectures: &[(Lecture, Uuid)]) {
    let lectures = lectures
        .iter()
        .map(|(lecture, user_id)| lecture.to_cloud(*user_id).unwrap())
        .collect();
    Mock::given(method("GET"))
        .and(path("/lectures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ListLecturesResponse { lectures }))
        .mount(server)
        .await;
}

/// Bodies of every POST /lectures the mock backend received, decoded.
pub async fn pushed_lectures(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method == wiremock::http::Method::Post && r.url.path() == "/lectures")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

pub fn count_requests(
    requests: &[wiremock::Request],
    verb: wiremock::http::Method,
    route: &str,
) -> usize {
    requests
        .iter()
        .filter(|r| r.method == verb && r.url.path() == route)
        .count()
}
