use std::net::TcpListener;
use std::sync::Arc;

use actix_web::web;
use smarthome_auth::auth::{BcryptVerifier, SessionService, DEFAULT_COST};
use smarthome_auth::cache::{InMemoryRevocationCache, RedisRevocationCache, RevocationCache};
use smarthome_auth::clock::{Clock, SystemClock};
use smarthome_auth::configuration::{get_configuration, Settings};
use smarthome_auth::startup::run;
use smarthome_auth::store::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};
use smarthome_auth::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

fn startup_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

async fn build_cache(
    settings: &Settings,
    clock: Arc<dyn Clock>,
) -> std::io::Result<Arc<dyn RevocationCache>> {
    match &settings.redis {
        Some(redis) => {
            tracing::info!("Connecting to Redis revocation cache");
            let cache = RedisRevocationCache::connect(&redis.url)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to Redis: {}", e);
                    startup_error(std::io::ErrorKind::ConnectionRefused, "Redis connection error")
                })?
                .with_timeout(redis.operation_timeout());
            Ok(Arc::new(cache))
        }
        None => {
            tracing::warn!("No redis settings; revocations are kept in process memory");
            Ok(Arc::new(InMemoryRevocationCache::new(clock)))
        }
    }
}

async fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn CredentialStore>> {
    match &settings.database {
        Some(database) => {
            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
                })?;
            Ok(Arc::new(PgCredentialStore::new(pool)))
        }
        None if settings.application.seed_default_admin => {
            tracing::warn!("No database settings; using in-memory store with the default admin");
            let store = InMemoryCredentialStore::with_default_admin(DEFAULT_COST).map_err(|e| {
                tracing::error!("Failed to seed default admin: {}", e);
                startup_error(std::io::ErrorKind::Other, "Credential store error")
            })?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No database settings; using an empty in-memory store");
            Ok(Arc::new(InMemoryCredentialStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(startup_error(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = build_cache(&configuration, clock.clone()).await?;
    let store = build_store(&configuration).await?;

    let sessions = SessionService::new(
        &configuration.jwt,
        clock,
        cache,
        store,
        Arc::new(BcryptVerifier),
    )
    .map_err(|e| {
        tracing::error!("Refusing to start: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "JWT configuration error")
    })?;

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, web::Data::new(sessions))?;
    tracing::info!("Server started successfully");

    server.await
}
