use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::Response,
    Json,
};

use crate::catalog::error_response;

/// `Json` body extractor whose rejections use the API's JSON error body
/// instead of axum's plain-text one.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(error_response(rejection.status(), rejection.body_text())),
        }
    }
}
