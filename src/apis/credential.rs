//! Salted password credentials stored on user records.
//!
//! A user's `Credentials` property is an array of credential objects, at most
//! one per `Type`. The password credential is `{Type: "Password", Salt, Hash}`
//! with `Hash = SHA-256(salt || password)`; both fields are base64.

use crate::error::DispatchError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// `Type` tag of password credentials.
pub const PASSWORD_CREDENTIAL: &str = "Password";

/// Property holding a user's credential list.
pub const CREDENTIALS_PROPERTY: &str = "Credentials";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCredential {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Salt")]
    pub salt: String,
    #[serde(rename = "Hash")]
    pub hash: String,
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

impl PasswordCredential {
    /// Hash `password` under a fresh random salt.
    ///
    /// # Errors
    ///
    /// `InvalidArgument("password")` for an empty password.
    pub fn new(password: &str) -> Result<Self, DispatchError> {
        if password.is_empty() {
            return Err(DispatchError::InvalidArgument("password".into()));
        }
        let salt = ulid::Ulid::new().to_bytes();
        Ok(Self {
            kind: PASSWORD_CREDENTIAL.to_string(),
            salt: STANDARD.encode(salt),
            hash: STANDARD.encode(digest(&salt, password)),
        })
    }

    /// `true` when `password` hashes to the stored value.
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (STANDARD.decode(&self.salt), STANDARD.decode(&self.hash))
        else {
            return false;
        };
        let actual = digest(&salt, password);
        actual.len() == expected.len()
            && actual
                .iter()
                .zip(expected.iter())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }

    /// Find the password credential in a `Credentials` value.
    #[must_use]
    pub fn find(credentials: Option<&Value>) -> Option<Self> {
        credentials?
            .as_array()?
            .iter()
            .find(|c| c.get("Type").and_then(Value::as_str) == Some(PASSWORD_CREDENTIAL))
            .and_then(|c| serde_json::from_value(c.clone()).ok())
    }

    /// Return `credentials` with this credential replacing any of the same type.
    pub fn merge_into(&self, credentials: Option<&Value>) -> Result<Value, DispatchError> {
        let mine = serde_json::to_value(self).map_err(|e| DispatchError::Db(e.into()))?;
        let mut list: Vec<Value> = credentials
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        match list
            .iter_mut()
            .find(|c| c.get("Type").and_then(Value::as_str) == Some(self.kind.as_str()))
        {
            Some(slot) => *slot = mine,
            None => list.push(mine),
        }
        Ok(Value::Array(list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verify_accepts_only_the_original_password() {
        let cred = PasswordCredential::new("hunter2").unwrap();
        assert!(cred.verify("hunter2"));
        assert!(!cred.verify("hunter3"));
        assert!(!cred.verify(""));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let a = PasswordCredential::new("pw").unwrap();
        let b = PasswordCredential::new("pw").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_empty_password_is_rejected() {
        assert!(matches!(
            PasswordCredential::new(""),
            Err(DispatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_merge_replaces_existing_password() {
        let old = PasswordCredential::new("old").unwrap();
        let list = old.merge_into(Some(&json!([{"Type": "Key", "Id": 1}]))).unwrap();
        assert_eq!(list.as_array().unwrap().len(), 2);

        let new = PasswordCredential::new("new").unwrap();
        let list = new.merge_into(Some(&list)).unwrap();
        assert_eq!(list.as_array().unwrap().len(), 2);
        let found = PasswordCredential::find(Some(&list)).unwrap();
        assert!(found.verify("new"));
        assert!(!found.verify("old"));
    }

    #[test]
    fn test_corrupt_credential_never_verifies() {
        let cred = PasswordCredential {
            kind: PASSWORD_CREDENTIAL.into(),
            salt: "***".into(),
            hash: "***".into(),
        };
        assert!(!cred.verify("anything"));
    }
}
