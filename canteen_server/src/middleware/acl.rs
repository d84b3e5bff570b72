//! Access control list middleware for the canteen server.
//! This middleware can be placed on any route or service.
//!
//! It reads the caller's [`Identity`] from the request headers and checks their role against the roles allowed on the
//! route. If the caller holds one of the allowed roles, the identity is stored in the request extensions and the
//! request is allowed to continue. An empty list of roles admits any identified caller.
//!
//! Requests without a usable identity are refused with 401 Unauthorized. Identified callers without a suitable role get
//! 403 Forbidden.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use canteen_engine::db_types::Role;
use futures::future::{ok, Ready};
use log::*;

use crate::{
    auth::Identity,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[Role]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
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
        let service = Rc::clone(&self.service);
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let identity = Identity::from_headers(req.headers()).map_err(|e| {
                debug!("💻️ Refusing request to {} without a valid identity. {e}", req.path());
                ServerError::from(e)
            })?;
            if !allowed_roles.is_empty() && !allowed_roles.contains(&identity.role) {
                warn!("💻️ User #{} ({}) may not access {}", identity.user_id, identity.role, req.path());
                let msg = format!("{} may not access this resource", identity.role);
                return Err(ServerError::from(AuthError::InsufficientPermissions(msg)).into());
            }
            req.extensions_mut().insert(identity);
            service.call(req).await
        })
    }
}
