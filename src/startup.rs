use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::blacklist::TokenBlacklist;
use crate::configuration::JwtSettings;
use crate::email_client::EmailClient;
use crate::logger::LoggerMiddleware;
use crate::routes::{
    confirm_reset, get_current_player, health_check, list_sessions, login, logout, refresh,
    register, request_reset, revoke_all_sessions, revoke_session, verify_reset,
};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    blacklist: TokenBlacklist,
    email_client: EmailClient,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let blacklist = web::Data::new(blacklist);
    let email_client = web::Data::new(email_client);
    let jwt_config_data = web::Data::new(jwt_config);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(connection.clone())
            .app_data(blacklist.clone())
            .app_data(email_client.clone())
            .app_data(jwt_config_data.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route(
                "/auth/password-reset/request",
                web::post().to(request_reset),
            )
            .route("/auth/password-reset/verify", web::get().to(verify_reset))
            .route(
                "/auth/password-reset/confirm",
                web::post().to(confirm_reset),
            )
            // Routes that resolve the caller through the auth gateway
            .route("/auth/logout", web::post().to(logout))
            .route("/auth/me", web::get().to(get_current_player))
            .route("/auth/sessions", web::get().to(list_sessions))
            .route("/auth/sessions", web::delete().to(revoke_all_sessions))
            .route("/auth/sessions/{id}", web::delete().to(revoke_session))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
