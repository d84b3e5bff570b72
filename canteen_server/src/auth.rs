//! Request identity.
//!
//! Users are authenticated upstream of this server. The authenticating proxy passes the caller's identity on in two
//! headers: `canteen-user-id` and `canteen-user-role`. [`Identity`] reads them, and is available as a request extractor
//! in every handler.
use std::{future::Future, pin::Pin, str::FromStr};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpMessage, HttpRequest};
use canteen_engine::db_types::{Role, UserId};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "canteen-user-id";
pub const USER_ROLE_HEADER: &str = "canteen-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let user_id = header_value(headers, USER_ID_HEADER)?;
        let role = header_value(headers, USER_ROLE_HEADER)?;
        let user_id = UserId::from_str(user_id)
            .map_err(|e| AuthError::InvalidIdentity(format!("{USER_ID_HEADER} is not a valid user id. {e}")))?;
        let role = Role::from_str(role).map_err(|e| AuthError::InvalidIdentity(e.to_string()))?;
        Ok(Self { user_id, role })
    }
}

fn header_value<'h>(headers: &'h HeaderMap, name: &str) -> Result<&'h str, AuthError> {
    let value = headers.get(name).ok_or(AuthError::MissingIdentity)?;
    value.to_str().map_err(|e| {
        debug!("💻️ Could not read {name} header. {e}");
        AuthError::InvalidIdentity(format!("{name} is not valid text"))
    })
}

impl FromRequest for Identity {
    type Error = ServerError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // The ACL middleware will already have parsed the headers for protected routes
        let result = match req.extensions().get::<Identity>() {
            Some(identity) => Ok(*identity),
            None => Identity::from_headers(req.headers()).map_err(ServerError::from),
        };
        Box::pin(async move { result })
    }
}
