/// Project, agent, cost and activity routes
///
/// All routes sit behind `JwtMiddleware`. Ownership is checked here:
/// a resource belonging to someone else answers 404, the same as one
/// that does not exist.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::error::AppError;
use crate::store::{NewProject, Project, ProjectStore, Store};
use crate::validators::{validate_description, validate_name};

const DEFAULT_ACTIVITY_LIMIT: i64 = 20;
const MAX_ACTIVITY_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ProjectCostResponse {
    pub project_id: String,
    pub total_cost: f64,
}

/// Load a project and make sure the caller owns it
async fn owned_project(
    store: &dyn Store,
    identity: &Identity,
    project_id: &str,
) -> Result<Project, AppError> {
    match store.get_project_by_id(project_id).await? {
        Some(project) if project.user_id == identity.user_id => Ok(project),
        Some(_) => {
            tracing::warn!(
                user_id = %identity.user_id,
                project_id = %project_id,
                "Access to another user's project refused"
            );
            Err(AppError::NotFound("Project".to_string()))
        }
        None => Err(AppError::NotFound("Project".to_string())),
    }
}

/// GET /api/projects
pub async fn list_projects(
    identity: Identity,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let projects = store.list_projects_by_user(&identity.user_id).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// POST /api/projects
///
/// # Errors
/// - 400: Empty or oversized name/description
pub async fn create_project(
    identity: Identity,
    form: web::Json<CreateProjectRequest>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let name = validate_name("name", &form.name)?;
    let description = validate_description(form.description.as_deref())?;

    let project = store
        .create_project(NewProject {
            user_id: identity.user_id.clone(),
            name,
            description,
        })
        .await?;

    tracing::info!(user_id = %identity.user_id, project_id = %project.id, "Project created");
    Ok(HttpResponse::Created().json(project))
}

/// GET /api/projects/{project_id}/agents
pub async fn list_project_agents(
    identity: Identity,
    path: web::Path<String>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let project = owned_project(store.get_ref(), &identity, &path).await?;
    let agents = store.list_agents_by_project(&project.id).await?;
    Ok(HttpResponse::Ok().json(agents))
}

/// GET /api/projects/{project_id}/cost
pub async fn get_project_cost(
    identity: Identity,
    path: web::Path<String>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let project = owned_project(store.get_ref(), &identity, &path).await?;
    let total_cost = store.get_total_cost_by_project(&project.id).await?;

    Ok(HttpResponse::Ok().json(ProjectCostResponse {
        project_id: project.id,
        total_cost,
    }))
}

/// GET /api/agents/{agent_id}
pub async fn get_agent(
    identity: Identity,
    path: web::Path<String>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let agent = store
        .get_agent_by_id(&path)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent".to_string()))?;

    owned_project(store.get_ref(), &identity, &agent.project_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound("Agent".to_string()),
            other => other,
        })?;

    Ok(HttpResponse::Ok().json(agent))
}

/// GET /api/activity?limit=n
pub async fn recent_activity(
    identity: Identity,
    query: web::Query<ActivityQuery>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);

    let activities = store.get_recent_activities(&identity.user_id, limit).await?;
    Ok(HttpResponse::Ok().json(activities))
}
