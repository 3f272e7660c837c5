//! Per-request capability context

use std::fmt;

/// Credentials and identity for backend requests
///
/// Passed explicitly to every backend call instead of living in shared
/// mutable state. Cheap to clone.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    bearer: Option<String>,
}

impl RequestContext {
    /// Context without credentials
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context authenticating with a bearer token
    ///
    /// A blank token is treated as no token.
    #[must_use]
    pub fn with_bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            bearer: (!token.trim().is_empty()).then_some(token),
        }
    }

    #[inline]
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.bearer.is_some()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
