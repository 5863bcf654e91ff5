//! Request-scoped operation context
//!
//! Every core operation receives an [`OpContext`] explicitly; there is no
//! process-wide notion of the current admin.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const ADMIN_USER_HEADER: &str = "x-admin-user";

const DEFAULT_ACTOR: &str = "admin";

/// Who is acting, and under which request id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpContext {
    pub request_id: Uuid,
    pub actor: String,
}

impl OpContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            actor: actor.into(),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OpContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let request_id = header(REQUEST_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v).ok())
            .unwrap_or_else(Uuid::new_v4);
        let actor = header(ADMIN_USER_HEADER).unwrap_or(DEFAULT_ACTOR).to_string();

        Ok(Self { request_id, actor })
    }
}
