use axum::extract::{rejection::JsonRejection, FromRequest, Request};

use crate::error::AppError;

/// Our own `Json` extractor so a malformed body becomes an `AppError::Contract`
/// (§7 kind 3) instead of axum's default plain-text rejection.
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => Err(AppError::Contract(rejection.body_text())),
        }
    }
}
