/// Bearer token authentication middleware
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderMap},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use chrono::{DateTime, Utc};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::error::AuthError;
use crate::security::{AuthOutcome, Authenticator, Rejection};

/// Identity attached to a request that passed authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub identity: String,
    pub expires_at: DateTime<Utc>,
}

/// Raw `Authorization` header value.
///
/// A value that is not valid visible ASCII is treated as present but
/// unusable, so it ends up `Malformed` rather than `NoCredential`.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or(""))
}

/// Rejects requests without a currently valid bearer token.
pub struct JwtAuthMiddleware {
    authenticator: Authenticator,
}

impl JwtAuthMiddleware {
    pub fn new(authenticator: Authenticator) -> Self {
        Self { authenticator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            authenticator: self.authenticator.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    authenticator: Authenticator,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let authenticator = self.authenticator.clone();

        Box::pin(async move {
            let header = authorization_header(req.headers()).map(str::to_owned);

            let verified = match authenticator.authenticate(header.as_deref()).await? {
                AuthOutcome::Accepted(verified) => verified,
                AuthOutcome::Rejected(reason) => {
                    return Err(AuthError::Unauthenticated(reason).into());
                }
            };

            req.extensions_mut().insert(AuthenticatedUser {
                identity: verified.identity,
                expires_at: verified.expires_at,
            });

            service.call(req).await
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(AuthError::Unauthenticated(Rejection::NoCredential).into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{InMemoryRevocationRegistry, RevocationRegistry, TokenIssuer};
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use crypto_core::jwt::DEFAULT_TOKEN_LIFETIME;
    use std::sync::Arc;
    use std::time::Duration;

    const SECRET: &[u8] = b"middleware-test-secret-0123456789abcdefgh";

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().body(user.identity)
    }

    async fn expiry(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().body(user.expires_at.timestamp().to_string())
    }

    fn setup() -> (Authenticator, Arc<TokenIssuer>, Arc<InMemoryRevocationRegistry>) {
        let issuer = Arc::new(TokenIssuer::new(SECRET, DEFAULT_TOKEN_LIFETIME).unwrap());
        let registry = Arc::new(InMemoryRevocationRegistry::new());
        (
            Authenticator::new(issuer.clone(), registry.clone()),
            issuer,
            registry,
        )
    }

    #[actix_web::test]
    async fn test_authorization_header_non_ascii_is_present() {
        let mut headers = HeaderMap::new();
        assert_eq!(authorization_header(&headers), None);

        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );
        assert_eq!(authorization_header(&headers), Some(""));
    }

    #[actix_web::test]
    async fn test_attaches_identity() {
        let (authenticator, issuer, _) = setup();
        let app = test::init_service(
            App::new()
                .wrap(JwtAuthMiddleware::new(authenticator))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let token = issuer.issue("alice").unwrap();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();

        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "alice");
    }

    #[actix_web::test]
    async fn test_attaches_token_expiry() {
        let (authenticator, issuer, _) = setup();
        let app = test::init_service(
            App::new()
                .wrap(JwtAuthMiddleware::new(authenticator))
                .route("/expiry", web::get().to(expiry)),
        )
        .await;

        let token = issuer.issue("alice").unwrap();
        let expected = issuer.verify(&token).unwrap().expires_at.timestamp();
        let req = test::TestRequest::get()
            .uri("/expiry")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();

        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, expected.to_string());
    }

    #[actix_web::test]
    async fn test_rejects_missing_and_revoked() {
        let (authenticator, issuer, registry) = setup();
        let app = test::init_service(
            App::new()
                .wrap(JwtAuthMiddleware::new(authenticator))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get().uri("/me").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let token = issuer.issue("alice").unwrap();
        registry
            .revoke(&token, Duration::from_secs(60))
            .await
            .unwrap();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_extractor_without_middleware() {
        let app = test::init_service(App::new().route("/me", web::get().to(whoami))).await;

        let req = test::TestRequest::get().uri("/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
