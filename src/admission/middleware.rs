//! Axum middleware running every request through the gate.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::admission::gate::{Admission, AdmissionGate, ProceedReason, Verdict};
use crate::observability::metrics;

/// Run the admission decision, letting the request through if it panics.
fn admit_or_fail_open(path: &str, decide: impl FnOnce() -> Admission) -> Admission {
    catch_unwind(AssertUnwindSafe(decide)).unwrap_or_else(|_| {
        tracing::error!(path = %path, "Admission check panicked, letting request through");
        Admission {
            verdict: Verdict::Proceed(ProceedReason::FailOpen),
            identity: None,
        }
    })
}

/// Middleware function for fixed-window admission.
///
/// Admitted requests carry the extracted [`ClientIdentity`] in their
/// extensions.
///
/// [`ClientIdentity`]: crate::admission::ClientIdentity
pub async fn admission_middleware(
    State(gate): State<Arc<AdmissionGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let admission = admit_or_fail_open(&path, || gate.admit(&path, request.headers()));

    metrics::record_decision(&admission.verdict);

    match admission.verdict {
        Verdict::Proceed(reason) => {
            if let Some(identity) = admission.identity {
                tracing::debug!(
                    path = %path,
                    reason = reason.as_str(),
                    ip_address = identity.address.as_ref().map(|a| a.as_str()),
                    user_agent = identity.user_agent.as_ref().map(|ua| ua.raw.as_str()),
                    "Request admitted"
                );
                request.extensions_mut().insert(identity);
            }
            next.run(request).await
        }
        Verdict::Reject(rejection) => {
            tracing::warn!(
                client = %rejection.client,
                path = %path,
                status = rejection.status().as_u16(),
                "Rate limit exceeded"
            );
            rejection.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::identity::ClientIdentity;

    #[test]
    fn panicking_decision_fails_open() {
        let admission = admit_or_fail_open("/api/create-dns-record", || {
            panic!("limiter fault");
        });

        assert_eq!(admission.verdict, Verdict::Proceed(ProceedReason::FailOpen));
        assert!(admission.identity.is_none());
    }

    #[test]
    fn completed_decision_passes_through() {
        let admission = admit_or_fail_open("/", || Admission {
            verdict: Verdict::Proceed(ProceedReason::UnidentifiedClient),
            identity: Some(ClientIdentity {
                address: None,
                user_agent: None,
            }),
        });

        assert_eq!(admission.verdict, Verdict::Proceed(ProceedReason::UnidentifiedClient));
        assert!(admission.identity.is_some());
    }
}
