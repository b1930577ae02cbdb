use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;

use player_auth::blacklist::TokenBlacklist;
use player_auth::configuration::get_configuration;
use player_auth::email_client::{EmailClient, SenderEmail};
use player_auth::startup::run;
use player_auth::telemetry::init_telemetry;

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
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let connection_string = configuration.database.connection_string();
    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&connection_string)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    tracing::info!("Database connection pool created successfully");

    let blacklist = TokenBlacklist::connect(&configuration.redis)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to revocation cache: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Revocation cache connection error",
            )
        })?;

    let sender = SenderEmail::parse(configuration.email.sender.clone()).map_err(|e| {
        tracing::error!("Invalid sender email in configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    let email_client = EmailClient::new(
        configuration.email.service_url.clone(),
        sender,
        configuration.email.reset_base_url.clone(),
        reqwest::Client::new(),
    );

    let address = format!("127.0.0.1:{}", configuration.application.port);
    tracing::info!("Binding server to address: {}", address);

    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let jwt_config = configuration.jwt.clone();

    let server = run(listener, pool, blacklist, email_client, jwt_config)?;
    tracing::info!("Server started successfully");

    server.await
}
