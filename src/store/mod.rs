/// Data access
///
/// The storage collaborator behind the service, expressed as traits so
/// handlers and the session flow never depend on a concrete database.

mod memory;
mod models;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryStore;
pub use models::{Activity, Agent, NewProject, Project, UserProfile, UserRecord, UserUpdate};
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or saturated; callers may retry
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("duplicate record: {0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => {
                StoreError::Conflict(db.message().to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// User lookups and the single-slot refresh token
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> Result<UserRecord, StoreError>;

    /// Overwrite the user's current refresh token (last write wins)
    async fn update_user_refresh_token(
        &self,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<(), StoreError>;
}

/// Projects, their agents, costs, and the activity feed
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError>;

    async fn get_project_by_id(&self, project_id: &str) -> Result<Option<Project>, StoreError>;

    async fn list_projects_by_user(&self, user_id: &str) -> Result<Vec<Project>, StoreError>;

    async fn list_agents_by_project(&self, project_id: &str) -> Result<Vec<Agent>, StoreError>;

    async fn get_agent_by_id(&self, agent_id: &str) -> Result<Option<Agent>, StoreError>;

    async fn get_total_cost_by_project(&self, project_id: &str) -> Result<f64, StoreError>;

    async fn get_recent_activities(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Activity>, StoreError>;
}

/// Everything the HTTP layer needs from storage
pub trait Store: UserStore + ProjectStore {}

impl<T: UserStore + ProjectStore> Store for T {}
