use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use dashboard_backend::auth::JwtKeys;
use dashboard_backend::configuration::get_configuration;
use dashboard_backend::startup::run;
use dashboard_backend::store::PgStore;
use dashboard_backend::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let configuration = match get_configuration() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    init_telemetry(
        &configuration.application.log_level,
        &configuration.application.log_format,
    );
    tracing::info!("Configuration loaded");

    // Refuse to start without a signing secret.
    let keys = JwtKeys::from_settings(&configuration.jwt).map_err(|e| {
        tracing::error!(error = %e, "Invalid JWT configuration");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // Connections are opened on demand so already-issued tokens keep
    // authenticating while the database is unreachable.
    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .acquire_timeout(Duration::from_secs(configuration.database.acquire_timeout_secs))
        .connect_lazy(&configuration.database.connection_string())
        .map_err(|e| {
            tracing::error!(error = %e, "Invalid database configuration");
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Database configuration error")
        })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "Server listening");

    let server = run(listener, Arc::new(PgStore::new(pool)), keys)?;
    server.await
}
