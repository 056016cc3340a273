use std::{fmt::Display, net::IpAddr};

use http::Request;
use tracing::Span;

struct OrUnknown<T>(Option<T>, &'static str);

impl<T: Display> Display for OrUnknown<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(val) => write!(f, "{val}"),
            None => write!(f, "{}", self.1),
        }
    }
}

pub fn span<B>(request: &Request<B>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok());

    let client_ip = request
        .extensions()
        .get::<Option<IpAddr>>()
        .copied()
        .flatten();

    // error level keeps the span, and with it the request id, on events
    // emitted deeper in the pipeline even when only `warn`/`error` are enabled
    tracing::error_span!(
        "request",
        client_ip = %OrUnknown(client_ip, "<unknown-client-ip>"),
        request_id = %OrUnknown(request_id, "<unknown-request-id>"),
        method = %request.method(),
        uri = %request.uri(),
    )
}
