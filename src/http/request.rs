//! Request helpers.
//!
//! The request ID is generated by `SetRequestIdLayer` at the outermost layer,
//! so every handler and the upstream see the same `x-request-id`.

use axum::extract::Request;

pub const X_REQUEST_ID: &str = "x-request-id";

/// The request's `x-request-id`, if present and printable.
pub fn request_id(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn reads_request_id_header() {
        let request = Request::builder()
            .header(X_REQUEST_ID, "abc-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_id(&request), Some("abc-123"));

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(request_id(&bare), None);
    }
}
