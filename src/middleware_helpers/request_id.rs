use crate::tracing::RequestId;
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

/// Header name for the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags every request with an id, reusing the caller's `x-request-id` when it
/// is a usable header value and minting one otherwise. The id is exposed as a
/// request extension, a task-local for error bodies, and a response header.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let (request_id, header_value) = incoming_or_generated(&request);

    request
        .headers_mut()
        .insert(HeaderName::from_static(REQUEST_ID_HEADER), header_value.clone());
    request.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id.as_str(),
        method = %request.method(),
        uri = %request.uri(),
    );

    let mut response =
        crate::tracing::scope_request_id(request_id, async move { next.run(request).await })
            .instrument(span)
            .await;

    response
        .headers_mut()
        .insert(HeaderName::from_static(REQUEST_ID_HEADER), header_value);

    response
}

/// A caller-supplied id is only kept when it round-trips as a header value,
/// so the insert below cannot fail.
fn incoming_or_generated(request: &Request) -> (RequestId, HeaderValue) {
    if let Some(value) = request.headers().get(REQUEST_ID_HEADER) {
        if let Ok(s) = value.to_str() {
            if !s.is_empty() {
                return (RequestId::new(s), value.clone());
            }
        }
    }

    let generated = RequestId::default();
    let value = HeaderValue::from_str(generated.as_str())
        .unwrap_or_else(|_| HeaderValue::from_static("invalid"));
    (generated, value)
}
