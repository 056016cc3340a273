/// JSON body of every 4xx response.
#[derive(serde::Serialize, Debug)]
pub struct ErrorResponse {
    message: String,
    datetime: Option<String>,
    help: &'static str,
}

impl ErrorResponse {
    const HELP: &str = "Please check the response headers for `x-request-id`, include the datetime and raise a support ticket.";

    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
            datetime: time::OffsetDateTime::now_utc()
                .format(&time::macros::format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
                ))
                .ok(),
            help: Self::HELP,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E: std::error::Error> From<E> for ErrorResponse {
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

#[cfg(feature = "axum")]
impl ErrorResponse {
    /// `(status, Json(ErrorResponse::from(error)))` as a response.
    pub fn respond(
        status: axum::http::StatusCode,
        error: impl std::error::Error,
    ) -> axum::response::Response {
        use axum::response::IntoResponse;

        (status, axum::Json(Self::from(error))).into_response()
    }
}
