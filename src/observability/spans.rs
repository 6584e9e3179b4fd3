//! Request spans.

use tracing::Span;

use crate::correlation::RequestId;

/// Span wrapping everything the bridge does for one request.
pub fn request_span(request_id: &RequestId, method: &str, path: &str) -> Span {
    tracing::info_span!(
        "bridge_request",
        request_id = %request_id,
        method = %method,
        path = %path,
    )
}
