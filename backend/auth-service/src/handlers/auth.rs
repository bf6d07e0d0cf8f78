/// Account and protected-route handlers
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AuthError, Result};
use crate::middleware::{authorization_header, AuthenticatedUser};
use crate::AppState;

/// `identity` + `password` form body shared by register and login
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsForm {
    #[serde(alias = "email", alias = "username")]
    #[validate(length(min = 1))]
    pub identity: String,

    #[validate(length(min = 1))]
    pub password: String,
}

impl CredentialsForm {
    fn validated(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AuthError::InvalidInput(e.to_string()))
    }
}

/// POST /register
pub async fn register(
    state: web::Data<AppState>,
    form: web::Form<CredentialsForm>,
) -> Result<HttpResponse> {
    form.validated()?;
    state.accounts.register(&form.identity, &form.password).await?;

    Ok(HttpResponse::Ok().body(format!("User {} registered", form.identity)))
}

/// POST /login
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<CredentialsForm>,
) -> Result<HttpResponse> {
    form.validated()?;
    let token = state.accounts.login(&form.identity, &form.password).await?;

    Ok(HttpResponse::Ok().body(format!("Token: {}", token)))
}

/// POST /logout
pub async fn logout(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    state
        .accounts
        .logout(authorization_header(req.headers()))
        .await?;

    Ok(HttpResponse::Ok().body("Successfully logged out"))
}

/// GET|POST /auth, only reachable through `JwtAuthMiddleware`
pub async fn authenticated(user: AuthenticatedUser) -> HttpResponse {
    tracing::debug!(
        identity = %user.identity,
        expires_at = %user.expires_at,
        "authenticated request"
    );
    HttpResponse::Ok().body("This is an authenticated response")
}
