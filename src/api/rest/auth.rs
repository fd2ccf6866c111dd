use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

/// Acting operator, resolved from the `x-operator-id` header set by the
/// authentication collaborator in front of this service. State-changing
/// routes take this extractor; its id also keys the support-ping cooldown.
pub struct Operator {
    pub id: Uuid,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Operator
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-operator-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .ok_or(AppError::Unauthorized)?;

        Ok(Self { id })
    }
}
