/// HTTP middleware utilities for blog-service
///
/// Provides optional JWT authentication: requests without an `Authorization`
/// header proceed as anonymous, requests with a valid Bearer token carry the
/// caller, and requests with a bad token are rejected with 401 when a handler
/// asks for the `Identity`.
pub mod permissions;

pub use permissions::*;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;

// =====================================================================
// Identity
// =====================================================================

/// Authenticated user behind the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub username: String,
}

/// Who is making the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Authenticated(Caller),
}

impl Identity {
    pub fn caller(&self) -> Option<&Caller> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(caller) => Some(caller),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.caller().is_some()
    }
}

impl From<Caller> for Identity {
    fn from(caller: Caller) -> Self {
        Identity::Authenticated(caller)
    }
}

/// Outcome of token verification stored in request extensions.
#[derive(Debug, Clone)]
enum Credential {
    Verified(Caller),
    Rejected(&'static str),
}

impl FromRequest for Identity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let identity = match req.extensions().get::<Credential>() {
            None => Ok(Identity::Anonymous),
            Some(Credential::Verified(caller)) => Ok(Identity::Authenticated(caller.clone())),
            Some(Credential::Rejected(reason)) => {
                Err(AppError::Unauthorized((*reason).to_string()).into())
            }
        };
        ready(identity)
    }
}

// =====================================================================
// JWT Authentication
// =====================================================================

/// Token claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    /// Expiry, seconds since the epoch
    pub exp: usize,
}

/// HS256 token verifier
#[derive(Clone)]
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn hs256(secret: &[u8], leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Caller, AppError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user ID".to_string()))?;

        Ok(Caller {
            id,
            username: data.claims.username,
        })
    }
}

/// Actix middleware that verifies an optional Bearer token.
pub struct IdentityMiddleware {
    validator: Arc<JwtValidator>,
}

impl IdentityMiddleware {
    pub fn new(validator: JwtValidator) -> Self {
        Self {
            validator: Arc::new(validator),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            validator: self.validator.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    validator: Arc<JwtValidator>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let credential = req
            .headers()
            .get("Authorization")
            .map(|header| match header.to_str().ok().and_then(|h| h.strip_prefix("Bearer ")) {
                None => Credential::Rejected("Invalid Authorization scheme"),
                Some(token) => match self.validator.verify(token.trim()) {
                    Ok(caller) => Credential::Verified(caller),
                    Err(_) => Credential::Rejected("Invalid or expired token"),
                },
            });

        match &credential {
            Some(Credential::Verified(caller)) => {
                tracing::debug!(user_id = %caller.id, "request authenticated");
            }
            Some(Credential::Rejected(reason)) => {
                tracing::debug!(reason = *reason, "credential rejected");
            }
            None => {}
        }

        if let Some(credential) = credential {
            req.extensions_mut().insert(credential);
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
