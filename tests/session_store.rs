use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashboard_backend::auth::{
    authenticate, issue_token_at, login, rotate_refresh_token, Identity, JwtKeys, TokenKind,
};
use dashboard_backend::configuration::JwtSettings;
use dashboard_backend::error::{AppError, AuthError};
use dashboard_backend::startup::run;
use dashboard_backend::store::{
    Activity, Agent, InMemoryStore, NewProject, Project, ProjectStore, StoreError, UserRecord,
    UserStore, UserUpdate,
};

const SECRET: &str = "session-store-secret-at-least-32-chars";
const PASSWORD: &str = "Correct123";

fn keys() -> JwtKeys {
    JwtKeys::from_settings(&JwtSettings::with_secret(SECRET)).unwrap()
}

/// Wraps an `InMemoryStore` and counts every call made through it
#[derive(Default)]
struct RecordingStore {
    inner: InMemoryStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: bool,
}

impl RecordingStore {
    fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for RecordingStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.read();
        self.inner.get_user_by_email(email).await
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.read();
        self.inner.get_user_by_id(user_id).await
    }

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> Result<UserRecord, StoreError> {
        self.write()?;
        self.inner.update_user(user_id, update).await
    }

    async fn update_user_refresh_token(
        &self,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<(), StoreError> {
        self.write()?;
        self.inner.update_user_refresh_token(user_id, refresh_token).await
    }
}

#[async_trait]
impl ProjectStore for RecordingStore {
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        self.write()?;
        self.inner.create_project(project).await
    }

    async fn get_project_by_id(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        self.read();
        self.inner.get_project_by_id(project_id).await
    }

    async fn list_projects_by_user(&self, user_id: &str) -> Result<Vec<Project>, StoreError> {
        self.read();
        self.inner.list_projects_by_user(user_id).await
    }

    async fn list_agents_by_project(&self, project_id: &str) -> Result<Vec<Agent>, StoreError> {
        self.read();
        self.inner.list_agents_by_project(project_id).await
    }

    async fn get_agent_by_id(&self, agent_id: &str) -> Result<Option<Agent>, StoreError> {
        self.read();
        self.inner.get_agent_by_id(agent_id).await
    }

    async fn get_total_cost_by_project(&self, project_id: &str) -> Result<f64, StoreError> {
        self.read();
        self.inner.get_total_cost_by_project(project_id).await
    }

    async fn get_recent_activities(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Activity>, StoreError> {
        self.read();
        self.inner.get_recent_activities(user_id, limit).await
    }
}

async fn seeded(store: &RecordingStore) -> String {
    let hash = bcrypt::hash(PASSWORD, 4).unwrap();
    store.inner.insert_user("a@x.com", None, &hash).await
}

#[tokio::test]
async fn wrong_password_performs_no_writes() {
    let store = RecordingStore::default();
    let id = seeded(&store).await;

    let result = login(&store, &keys(), "a@x.com", "Wrong123").await;

    assert!(matches!(result, Err(AppError::Auth(AuthError::InvalidCredentials))));
    assert_eq!(store.writes(), 0);
    assert_eq!(store.inner.refresh_token_of(&id).await, None);
}

#[tokio::test]
async fn failed_refresh_token_write_returns_no_session() {
    let store = RecordingStore::failing_writes();
    let id = seeded(&store).await;

    let result = login(&store, &keys(), "a@x.com", PASSWORD).await;

    assert!(matches!(result, Err(AppError::Storage(StoreError::Unavailable(_)))));
    assert_eq!(store.writes(), 1);
    assert_eq!(store.inner.refresh_token_of(&id).await, None);
}

#[tokio::test]
async fn failed_refresh_token_write_is_a_503_over_http() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(RecordingStore::failing_writes());
    seeded(&store).await;

    let server = run(listener, store.clone(), keys()).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    let response = reqwest::Client::new()
        .post(&format!("http://127.0.0.1:{}/auth/login", port))
        .json(&serde_json::json!({ "email": "a@x.com", "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(503, response.status().as_u16());
    let body = response.text().await.unwrap();
    assert!(!body.contains("access_token"));
    assert!(!body.contains("connection refused"));
}

#[tokio::test]
async fn rejected_bearer_tokens_never_reach_storage() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let keys = keys();

    let store = Arc::new(RecordingStore::default());
    let id = seeded(&store).await;
    let expired = issue_token_at(&Identity::new(id, "a@x.com"), TokenKind::Access, 0, &keys).unwrap();

    let server = run(listener, store.clone(), keys).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    let client = reqwest::Client::new();
    for header in [format!("Bearer {}", expired), "Bearer nonsense".to_string()] {
        let response = client
            .get(&format!("http://127.0.0.1:{}/api/projects", port))
            .header("Authorization", header)
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(401, response.status().as_u16());
    }

    let no_header = client
        .get(&format!("http://127.0.0.1:{}/api/me", port))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, no_header.status().as_u16());

    assert_eq!(store.reads(), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn authenticate_needs_no_storage() {
    let keys = keys();
    let identity = Identity::new("user-1", "a@x.com");
    let token = issue_token_at(
        &identity,
        TokenKind::Access,
        chrono::Utc::now().timestamp(),
        &keys,
    )
    .unwrap();

    let header = format!("Bearer {}", token);
    assert_eq!(authenticate(Some(&header), &keys).unwrap(), identity);
}

#[tokio::test]
async fn concurrent_rotations_leave_one_issued_token() {
    let store = Arc::new(InMemoryStore::new());
    let id = store.insert_user("a@x.com", None, "unused-hash").await;
    let keys = Arc::new(keys());
    let identity = Identity::new(id.clone(), "a@x.com");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            let keys = keys.clone();
            let identity = identity.clone();
            tokio::spawn(async move { rotate_refresh_token(store.as_ref(), &keys, &identity).await })
        })
        .collect();

    let issued: Vec<String> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("rotation failed"))
        .collect();

    let stored = store.refresh_token_of(&id).await.expect("slot is empty");
    assert!(issued.contains(&stored));
}
