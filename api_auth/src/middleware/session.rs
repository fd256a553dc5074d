use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::LOCATION,
};
use common::{error::AppError, session::SESSION_COOKIE};
use futures::future::{Ready, ok};

use crate::services::identity::IdentityProvider;

/// What a gated scope answers when the session cookie is missing or invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// 401 with a JSON error body. Used for API scopes.
    Deny,
    /// 302 to the given path. Used for pages.
    Redirect(String),
}

/// Lets a request through only with a valid session cookie and attaches the
/// decoded `IdentityClaims` to the request extensions.
pub struct SessionGate {
    identity: Arc<dyn IdentityProvider>,
    check_revoked: bool,
    rejection: Rc<Rejection>,
}

impl SessionGate {
    pub fn deny(identity: Arc<dyn IdentityProvider>, check_revoked: bool) -> Self {
        SessionGate {
            identity,
            check_revoked,
            rejection: Rc::new(Rejection::Deny),
        }
    }

    pub fn redirect(
        identity: Arc<dyn IdentityProvider>,
        check_revoked: bool,
        sign_in_path: &str,
    ) -> Self {
        SessionGate {
            identity,
            check_revoked,
            rejection: Rc::new(Rejection::Redirect(sign_in_path.to_string())),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = SessionGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SessionGateService {
            service: Arc::new(service),
            identity: self.identity.clone(),
            check_revoked: self.check_revoked,
            rejection: self.rejection.clone(),
        })
    }
}

pub struct SessionGateService<S> {
    service: Arc<S>,
    identity: Arc<dyn IdentityProvider>,
    check_revoked: bool,
    rejection: Rc<Rejection>,
}

impl<S, B> Service<ServiceRequest> for SessionGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let cookie = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
        let identity = self.identity.clone();
        let check_revoked = self.check_revoked;
        let rejection = self.rejection.clone();
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            let verified = match cookie.filter(|value| !value.is_empty()) {
                Some(value) => identity.verify_session_cookie(&value, check_revoked).await,
                None => Err(AppError::Unauthorized("No session cookie".to_string())),
            };

            match verified {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    srv.call(req).await.map(|res| res.map_into_boxed_body())
                }
                Err(error) => {
                    log::debug!("Session rejected for {}: {}", req.path(), error);
                    let response = match rejection.as_ref() {
                        Rejection::Deny => error.to_http_response(),
                        Rejection::Redirect(path) => HttpResponse::Found()
                            .append_header((LOCATION, path.as_str()))
                            .finish(),
                    };
                    Ok(req.into_response(response.map_into_boxed_body()))
                }
            }
        })
    }
}
