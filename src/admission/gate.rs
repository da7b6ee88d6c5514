//! The admission decision.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::admission::classifier::StaticAssetClassifier;
use crate::admission::identity::{ClientIdentity, ClientKey};
use crate::admission::limiter::{Decision, FixedWindowLimiter};
use crate::config::{BypassConfig, GateConfig, RateLimitConfig};
use crate::error::GateError;

/// Why a request was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProceedReason {
    /// Rate limiting is switched off.
    Disabled,
    /// Path is a static build asset.
    StaticAsset,
    /// No forwarded address; unidentifiable clients are never throttled.
    UnidentifiedClient,
    /// Counted and within the window budget.
    WithinBudget,
    /// The gate itself failed; traffic is let through rather than blocked.
    FailOpen,
}

impl ProceedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProceedReason::Disabled => "disabled",
            ProceedReason::StaticAsset => "static_asset",
            ProceedReason::UnidentifiedClient => "unidentified_client",
            ProceedReason::WithinBudget => "within_budget",
            ProceedReason::FailOpen => "fail_open",
        }
    }
}

/// A refused request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub client: ClientKey,
}

impl Rejection {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        "rate_limited"
    }

    pub fn status(&self) -> StatusCode {
        GateError::RateLimited.status_code()
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        GateError::RateLimited.into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Proceed(ProceedReason),
    Reject(Rejection),
}

impl Verdict {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Verdict::Proceed(_))
    }
}

/// Verdict plus the identity the gate saw. Static assets are never inspected,
/// so their identity is `None`.
#[derive(Debug, Clone)]
pub struct Admission {
    pub verdict: Verdict,
    pub identity: Option<ClientIdentity>,
}

/// Per-process admission gate. Build once, share through `Arc`.
#[derive(Debug)]
pub struct AdmissionGate {
    enabled: bool,
    classifier: StaticAssetClassifier,
    limiter: FixedWindowLimiter,
}

impl AdmissionGate {
    pub fn new(rate_limit: &RateLimitConfig, bypass: &BypassConfig) -> Self {
        Self {
            enabled: rate_limit.enabled,
            classifier: StaticAssetClassifier::new(bypass),
            limiter: FixedWindowLimiter::from_config(rate_limit),
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(&config.rate_limit, &config.bypass)
    }

    /// Decide whether a request to `path` carrying `headers` may proceed.
    pub fn admit(&self, path: &str, headers: &HeaderMap) -> Admission {
        if self.classifier.is_static(path) {
            return Admission {
                verdict: Verdict::Proceed(ProceedReason::StaticAsset),
                identity: None,
            };
        }

        let identity = ClientIdentity::from_headers(headers);

        let verdict = if !self.enabled {
            Verdict::Proceed(ProceedReason::Disabled)
        } else {
            match &identity.address {
                None => Verdict::Proceed(ProceedReason::UnidentifiedClient),
                Some(key) => match self.limiter.check(key) {
                    Decision::Allow { .. } => Verdict::Proceed(ProceedReason::WithinBudget),
                    Decision::Reject => Verdict::Reject(Rejection {
                        client: key.clone(),
                    }),
                },
            }
        };

        Admission {
            verdict,
            identity: Some(identity),
        }
    }

    pub fn limiter(&self) -> &FixedWindowLimiter {
        &self.limiter
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
