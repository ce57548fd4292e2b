mod auth;
mod health_check;
mod projects;

pub use auth::{get_current_user, login, refresh, update_current_user};
pub use health_check::health_check;
pub use projects::{
    create_project, get_agent, get_project_cost, list_project_agents, list_projects,
    recent_activity,
};
