use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Activity, Agent, NewProject, Project, UserRecord, UserUpdate};
use super::{ProjectStore, StoreError, UserStore};

/// Process-local store backed by maps
///
/// Used by the test suites and for running the service without a
/// database.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
    projects: RwLock<Vec<Project>>,
    agents: RwLock<Vec<Agent>>,
    costs: RwLock<Vec<(String, f64)>>,
    activities: RwLock<Vec<Activity>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user with an already-hashed password; returns the user id
    pub async fn insert_user(&self, email: &str, name: Option<&str>, password_hash: &str) -> String {
        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            password_hash: password_hash.to_string(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        let id = record.id.clone();
        self.users.write().await.insert(id.clone(), record);
        id
    }

    /// Attach an agent to a project; returns the agent id
    pub async fn insert_agent(&self, project_id: &str, name: &str, status: &str) -> String {
        let agent = Agent {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            status: status.to_string(),
            started_at: Utc::now(),
            completed_at: None,
        };
        let id = agent.id.clone();
        self.agents.write().await.push(agent);
        id
    }

    pub async fn insert_cost(&self, project_id: &str, amount: f64) {
        self.costs.write().await.push((project_id.to_string(), amount));
    }

    pub async fn insert_activity(
        &self,
        user_id: &str,
        project_id: Option<&str>,
        kind: &str,
        message: &str,
    ) {
        self.activities.write().await.push(Activity {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            project_id: project_id.map(str::to_string),
            kind: kind.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        });
    }

    /// Current refresh token slot for a user
    pub async fn refresh_token_of(&self, user_id: &str) -> Option<String> {
        self.users
            .read()
            .await
            .get(user_id)
            .and_then(|u| u.refresh_token.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;

        if let Some(name) = update.name {
            user.name = Some(name);
        }
        if let Some(password_hash) = update.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn update_user_refresh_token(
        &self,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        user.refresh_token = Some(refresh_token.to_string());
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            user_id: project.user_id,
            name: project.name,
            description: project.description,
            status: "active".to_string(),
            created_at: Utc::now(),
        };
        self.projects.write().await.push(project.clone());
        Ok(project)
    }

    async fn get_project_by_id(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        let projects = self.projects.read().await;
        Ok(projects.iter().find(|p| p.id == project_id).cloned())
    }

    async fn list_projects_by_user(&self, user_id: &str) -> Result<Vec<Project>, StoreError> {
        let projects = self.projects.read().await;
        let mut owned: Vec<Project> = projects
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn list_agents_by_project(&self, project_id: &str) -> Result<Vec<Agent>, StoreError> {
        let agents = self.agents.read().await;
        Ok(agents
            .iter()
            .filter(|a| a.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn get_agent_by_id(&self, agent_id: &str) -> Result<Option<Agent>, StoreError> {
        let agents = self.agents.read().await;
        Ok(agents.iter().find(|a| a.id == agent_id).cloned())
    }

    async fn get_total_cost_by_project(&self, project_id: &str) -> Result<f64, StoreError> {
        let costs = self.costs.read().await;
        Ok(costs
            .iter()
            .filter(|(id, _)| id == project_id)
            .map(|(_, amount)| amount)
            .sum())
    }

    async fn get_recent_activities(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Activity>, StoreError> {
        let activities = self.activities.read().await;
        let mut recent: Vec<Activity> = activities
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit.max(0) as usize);
        Ok(recent)
    }
}
