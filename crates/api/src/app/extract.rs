//! `ValidJson<T>`: deserialize then validate, rejecting with 400 before the
//! handler runs.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::de::DeserializeOwned;

use crate::app::errors::json_error;

/// A request body that can check itself and produce its validated form.
pub trait Validate {
    type Valid;

    fn validate(self) -> Result<Self::Valid, String>;
}

/// Extractor yielding the validated form of a JSON body `T`.
pub struct ValidJson<T: Validate>(pub T::Valid);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| json_error(StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text()))?;

        body.validate()
            .map(ValidJson)
            .map_err(|msg| json_error(StatusCode::BAD_REQUEST, "validation_error", msg))
    }
}
