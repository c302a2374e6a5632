//! # Security Module
//!
//! Token lifecycle and the per-request security context.
//!
//! ## Token Lifecycle
//!
//! 1. A request may carry a token in the `st` argument (cookie, query or body).
//! 2. The dispatcher parses it with [`SecurityTokenManager::parse`] before the
//!    action runs. A malformed or expired token fails the whole request with
//!    `InvalidCredential`.
//! 3. The role is re-read from the user record's [`ROLE_PROPERTY`]. The token
//!    role is only used for identities that have no record.
//! 4. When the token is close to expiry ([`SecurityTokenManager::claim_renewal`])
//!    a fresh one carrying the current role is issued once and attached to the
//!    response as a cookie.
//! 5. A request without a token runs with an anonymous [`SecurityContext`].
//!
//! ## Authorization
//!
//! The dispatcher never authorizes. Actions call the `verify_*` helpers on
//! [`SecurityContext`] themselves:
//!
//! ```rust
//! use objrouter::security::{SecurityContext, UserRef};
//!
//! let ctx = SecurityContext::authenticated(UserRef {
//!     path: "name://Users/alice".into(),
//!     role: Some("User".into()),
//! });
//! assert!(ctx.verify_owner("name://Users/alice").is_ok());
//! assert!(ctx.verify_owner("name://Users/bob").is_err());
//! ```

use crate::error::DispatchError;

mod token;

pub use token::{
    unix_now, ParsedToken, SecurityTokenManager, TokenClaims, DEFAULT_RENEW_THRESHOLD,
    DEFAULT_TOKEN_LIFETIME,
};

/// Role name granting administrative rights.
pub const ROLE_ADMIN: &str = "Admin";
/// Role name used by trusted back-office callers.
pub const ROLE_SERVER: &str = "Server";
/// Role given to self-registered users.
pub const ROLE_USER: &str = "User";

/// User record property holding the role. Authoritative over the role a
/// token carries.
pub const ROLE_PROPERTY: &str = "Role";

/// Identity carried by a security token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    /// Object address of the user record, e.g. `name://Users/alice`
    pub path: String,
    pub role: Option<String>,
}

/// Security state of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityContext {
    pub user: Option<UserRef>,
}

impl SecurityContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn authenticated(user: UserRef) -> Self {
        Self { user: Some(user) }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }

    /// The caller's identity, or `InvalidCredential` when anonymous.
    pub fn require_user(&self) -> Result<&UserRef, DispatchError> {
        self.user
            .as_ref()
            .ok_or_else(|| DispatchError::InvalidCredential("authentication required".into()))
    }

    /// `true` when the caller holds any of `roles`.
    #[must_use]
    pub fn has_role(&self, roles: &[&str]) -> bool {
        self.user
            .as_ref()
            .and_then(|u| u.role.as_deref())
            .is_some_and(|role| roles.contains(&role))
    }

    /// Caller must be the object at `path`.
    pub fn verify_owner(&self, path: &str) -> Result<(), DispatchError> {
        let user = self.require_user()?;
        if user.path == path {
            Ok(())
        } else {
            Err(DispatchError::PermissionDenied(path.to_string()))
        }
    }

    /// Caller must be the object at `path` or hold one of `roles`.
    pub fn verify_owner_or_role(&self, path: &str, roles: &[&str]) -> Result<(), DispatchError> {
        let user = self.require_user()?;
        if user.path == path || self.has_role(roles) {
            Ok(())
        } else {
            Err(DispatchError::PermissionDenied(path.to_string()))
        }
    }

    /// Caller must hold one of `roles`.
    pub fn verify_role(&self, roles: &[&str]) -> Result<(), DispatchError> {
        self.require_user()?;
        if self.has_role(roles) {
            Ok(())
        } else {
            Err(DispatchError::PermissionDenied(format!(
                "requires one of {roles:?}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(path: &str, role: &str) -> SecurityContext {
        SecurityContext::authenticated(UserRef {
            path: path.into(),
            role: Some(role.into()),
        })
    }

    #[test]
    fn test_anonymous_is_invalid_credential() {
        let anon = SecurityContext::anonymous();
        assert!(matches!(
            anon.verify_owner("name://Users/a"),
            Err(DispatchError::InvalidCredential(_))
        ));
        assert!(matches!(
            anon.verify_role(&[ROLE_ADMIN]),
            Err(DispatchError::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_owner_or_role() {
        let admin = ctx("name://Users/root", ROLE_ADMIN);
        assert!(admin.verify_owner_or_role("name://Users/a", &[ROLE_ADMIN]).is_ok());
        assert!(matches!(
            admin.verify_owner("name://Users/a"),
            Err(DispatchError::PermissionDenied(_))
        ));

        let user = ctx("name://Users/a", ROLE_USER);
        assert!(user.verify_owner_or_role("name://Users/a", &[ROLE_ADMIN]).is_ok());
        assert!(matches!(
            user.verify_role(&[ROLE_ADMIN, ROLE_SERVER]),
            Err(DispatchError::PermissionDenied(_))
        ));
    }
}
