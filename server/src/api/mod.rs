pub mod accommodations;
pub mod health;
pub mod spots;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog::ValidationError;
use extra::ErrorResponse;

/// Failure of a catalog endpoint.
///
/// Store failures are logged and answered with a bare 500; a missing entity
/// is a 404 with the usual JSON body.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    DataAccess(#[from] contextual::Error<data_access::Error>),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(_) => {
                tracing::info!("{:?}", self);
                ErrorResponse::respond(StatusCode::BAD_REQUEST, self)
            }
            Error::DataAccess(ref err) if err.inner().is_not_found() => {
                tracing::info!("{}", self);
                ErrorResponse::respond(StatusCode::NOT_FOUND, self)
            }
            Error::DataAccess(_) => {
                tracing::error!("{:?}", self);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
