use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::SessionService;
use crate::logger::LoggerMiddleware;
use crate::middleware::{JwtMiddleware, MetricsMiddleware};
use crate::routes::{health_check, login, logout, me, metrics, refresh, validate};

pub fn run(
    listener: TcpListener,
    sessions: web::Data<SessionService>,
) -> Result<Server, std::io::Error> {
    let auth_metrics = web::Data::from(sessions.metrics().clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(MetricsMiddleware::new(sessions.metrics().clone()))
            .wrap(LoggerMiddleware)
            .app_data(sessions.clone())
            .app_data(auth_metrics.clone())
            .route("/health_check", web::get().to(health_check))
            .route("/metrics", web::get().to(metrics))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/auth")
                            .route("/login", web::post().to(login))
                            .route("/logout", web::post().to(logout))
                            .route("/refresh", web::post().to(refresh))
                            .route("/validate", web::post().to(validate)),
                    )
                    // Protected routes (require a valid access token)
                    .service(
                        web::resource("/me")
                            .wrap(JwtMiddleware)
                            .route(web::get().to(me)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
