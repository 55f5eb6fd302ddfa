//! Branch scoping through the `X-Branch-ID` header

use axum::http::{request::Parts, HeaderMap};

use crate::error::AppError;

pub const BRANCH_HEADER: &str = "X-Branch-ID";

/// The branch a request operates on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Branch(pub i64);

/// Parse the branch id out of the request headers
pub fn parse_branch_id(headers: &HeaderMap) -> Result<i64, AppError> {
    let raw = headers
        .get(BRANCH_HEADER)
        .ok_or_else(|| AppError::Validation {
            field: BRANCH_HEADER.to_string(),
            message: "header is required".to_string(),
        })?
        .to_str()
        .map_err(|_| AppError::Validation {
            field: BRANCH_HEADER.to_string(),
            message: "header must be ASCII".to_string(),
        })?;

    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::Validation {
            field: BRANCH_HEADER.to_string(),
            message: "must be a positive integer".to_string(),
        }),
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for Branch
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_branch_id(&parts.headers).map(Branch)
    }
}
