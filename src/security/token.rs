use super::UserRef;
use crate::error::DispatchError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Default token lifetime (one hour).
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Default renewal threshold: renew once less than ten minutes remain.
pub const DEFAULT_RENEW_THRESHOLD: Duration = Duration::from_secs(600);

/// Claims carried by a security token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Address of the user the token was issued for; absent for anonymous tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iat: u64,
    pub exp: u64,
    /// Unique token id
    #[serde(default)]
    pub jti: String,
}

/// A successfully verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    pub id: String,
    pub user: Option<UserRef>,
    /// Expiry as unix seconds
    pub expires_at: u64,
}

/// Issues, verifies and renews self-contained HS256 security tokens.
///
/// A token is valid as long as its signature checks out and its `exp` lies in
/// the future. The only server-side state is the set of live tokens that were
/// already renewed, so each token is renewed at most once.
pub struct SecurityTokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
    renew_threshold: Duration,
    /// `(id, exp)` of renewed tokens that have not expired yet
    renewed: Mutex<HashSet<(String, u64)>>,
}

impl SecurityTokenManager {
    /// Create a manager signing with `secret` and the default lifetimes.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime: DEFAULT_TOKEN_LIFETIME,
            renew_threshold: DEFAULT_RENEW_THRESHOLD,
            renewed: Mutex::new(HashSet::new()),
        }
    }

    /// Set how long issued tokens stay valid.
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the remaining lifetime below which a token is renewed.
    pub fn renew_threshold(mut self, threshold: Duration) -> Self {
        self.renew_threshold = threshold;
        self
    }

    #[must_use]
    pub fn token_lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Verify a token and return its identity and expiry.
    ///
    /// # Errors
    ///
    /// `InvalidCredential` for malformed tokens, bad signatures and expired tokens.
    pub fn parse(&self, token: &str) -> Result<ParsedToken, DispatchError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            warn!(error = %e, "Security token rejected");
            DispatchError::InvalidCredential("security token".into())
        })?;
        let claims = data.claims;
        debug!(
            anonymous = claims.sub.is_none(),
            expires_at = claims.exp,
            "Security token accepted"
        );
        Ok(ParsedToken {
            id: claims.jti,
            user: claims.sub.map(|path| UserRef {
                path,
                role: claims.role,
            }),
            expires_at: claims.exp,
        })
    }

    /// `true` when less than the renewal threshold remains before `expires_at`.
    #[must_use]
    pub fn should_renew(&self, expires_at: u64) -> bool {
        self.should_renew_at(expires_at, unix_now())
    }

    fn should_renew_at(&self, expires_at: u64, now: u64) -> bool {
        expires_at.saturating_sub(now) < self.renew_threshold.as_secs()
    }

    /// Claim the single renewal `token` is entitled to. `true` when the token
    /// is close to expiry and has not been renewed before; a client that keeps
    /// presenting an already renewed token gets no further replacements.
    pub fn claim_renewal(&self, token: &ParsedToken) -> bool {
        let now = unix_now();
        if !self.should_renew_at(token.expires_at, now) {
            return false;
        }
        let mut renewed = self.renewed.lock();
        renewed.retain(|(_, exp)| *exp > now);
        renewed.insert((token.id.clone(), token.expires_at))
    }

    /// Issue a fresh token for `user`, or an anonymous one.
    pub fn issue(&self, user: Option<&UserRef>) -> Result<String, DispatchError> {
        let now = unix_now();
        self.issue_at(user, now, now + self.lifetime.as_secs())
    }

    pub(crate) fn issue_at(
        &self,
        user: Option<&UserRef>,
        iat: u64,
        exp: u64,
    ) -> Result<String, DispatchError> {
        let claims = TokenClaims {
            sub: user.map(|u| u.path.clone()),
            role: user.and_then(|u| u.role.clone()),
            iat,
            exp,
            jti: ulid::Ulid::new().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            DispatchError::InvalidOperation(format!("cannot issue security token: {e}"))
        })
    }
}

/// Seconds since the unix epoch.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
