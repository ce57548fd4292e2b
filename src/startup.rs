use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::JwtKeys;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_project, get_agent, get_current_user, get_project_cost, health_check,
    list_project_agents, list_projects, login, recent_activity, refresh, update_current_user,
};
use crate::store::Store;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn Store>,
    keys: JwtKeys,
) -> Result<Server, std::io::Error> {
    let store = web::Data::from(store);
    let keys = Arc::new(keys);
    let keys_data = web::Data::from(keys.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Shared state
            .app_data(store.clone())
            .app_data(keys_data.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))

            // Protected routes (require a bearer access token)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(keys.clone()))
                    .route("/me", web::get().to(get_current_user))
                    .route("/me", web::patch().to(update_current_user))
                    .route("/projects", web::get().to(list_projects))
                    .route("/projects", web::post().to(create_project))
                    .route("/projects/{project_id}/agents", web::get().to(list_project_agents))
                    .route("/projects/{project_id}/cost", web::get().to(get_project_cost))
                    .route("/agents/{agent_id}", web::get().to(get_agent))
                    .route("/activity", web::get().to(recent_activity)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
