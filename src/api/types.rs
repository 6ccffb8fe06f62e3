//! Shared types for the API layer.

use std::sync::Arc;

use subtle::ConstantTimeEq;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }

    /// Check `code` against the privilege an action needs.
    pub fn authorize(&self, code: Option<&str>, required: Capability) -> Result<(), ApiError> {
        if self.grants(code, required) {
            Ok(())
        } else {
            tracing::debug!(required = ?required, "Capability check failed");
            Err(ApiError::Forbidden)
        }
    }

    fn grants(&self, code: Option<&str>, required: Capability) -> bool {
        if required == Capability::Public {
            return true;
        }
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return false;
        };
        let is_admin = codes_match(code, self.core.admin_code());
        match required {
            Capability::Public => true,
            Capability::Unit => is_admin || codes_match(code, self.core.unit_code()),
            Capability::Admin => is_admin,
        }
    }
}

/// Privilege level an action requires. Admin satisfies unit checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Public,
    Unit,
    Admin,
}

fn codes_match(given: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(given.as_bytes().ct_eq(expected.as_bytes()))
}

/// Action name attached to response extensions for the access log.
#[derive(Debug, Clone)]
pub struct ActionTag(pub String);

/// Response header carrying the cache outcome of a query.
pub const CACHE_HEADER: &str = "x-cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Stale,
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Stale => "STALE",
            Self::Bypass => "BYPASS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::core_state::Clock;
    use crate::query_cache::QueryCache;

    fn ctx() -> ApiContext {
        let core = CoreState::new(
            "unused.db".into(),
            QueryCache::new(Duration::from_secs(30), 10),
            "unit-secret".into(),
            "admin-secret".into(),
            Clock::with_offset_hours(7),
            Duration::from_secs(10),
            true,
        );
        ApiContext::new(Arc::new(core))
    }

    #[test]
    fn public_needs_no_code() {
        assert!(ctx().authorize(None, Capability::Public).is_ok());
    }

    #[test]
    fn unit_code_grants_unit_only() {
        let ctx = ctx();
        assert!(ctx.authorize(Some("unit-secret"), Capability::Unit).is_ok());
        assert!(matches!(
            ctx.authorize(Some("unit-secret"), Capability::Admin),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn admin_code_grants_both() {
        let ctx = ctx();
        assert!(ctx.authorize(Some("admin-secret"), Capability::Unit).is_ok());
        assert!(ctx.authorize(Some("admin-secret"), Capability::Admin).is_ok());
    }

    #[test]
    fn missing_and_wrong_codes_fail_the_same_way() {
        let ctx = ctx();
        for code in [None, Some(""), Some("   "), Some("guess"), Some("unit-secre")] {
            assert!(
                matches!(ctx.authorize(code, Capability::Unit), Err(ApiError::Forbidden)),
                "{code:?}"
            );
        }
    }
}
