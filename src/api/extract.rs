//! Request extractors.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::RouterError;

/// JSON body extractor whose rejections use the crate's error shape.
///
/// Axum's own [`Json`] answers malformed bodies with a plain-text 400 or
/// 422. This wrapper turns every rejection into
/// [`RouterError::Validation`] so clients always see
/// `{"error": {"code", "message"}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RouterError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(RouterError::Validation(rejection.body_text())),
        }
    }
}
