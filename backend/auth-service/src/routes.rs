/// Route table
use actix_web::web;

use crate::error::AuthError;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::middleware::JwtAuthMiddleware;
use crate::AppState;

/// Register every route and the shared state on an actix `App`.
pub fn configure(cfg: &mut web::ServiceConfig, state: web::Data<AppState>) {
    let authenticator = state.authenticator.clone();

    cfg.app_data(state)
        .app_data(web::FormConfig::default().error_handler(|err, _req| {
            AuthError::InvalidInput(format!("invalid form body: {}", err)).into()
        }))
        .route("/health", web::get().to(handlers::health_check))
        .route("/metrics", web::get().to(metrics_handler))
        .route("/register", web::post().to(handlers::register))
        .route("/login", web::post().to(handlers::login))
        .route("/logout", web::post().to(handlers::logout))
        .service(
            web::resource("/auth")
                .wrap(JwtAuthMiddleware::new(authenticator))
                .route(web::get().to(handlers::authenticated))
                .route(web::post().to(handlers::authenticated)),
        );
}
