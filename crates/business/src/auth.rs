//! Authentication primitives
//!
//! Password hashing behind a trait, the authenticated principal, and the
//! session check every protected operation goes through.

use crate::error::{BusinessError, BusinessResult};
use rand::RngCore;
use rcard_core::UserId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;

/// Password hashing capability
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Salted SHA-256, stored as `salt_hex$digest_hex`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    fn digest(salt: &[u8], password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PasswordHasher for Sha256Hasher {
    fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        format!("{}${}", hex::encode(salt), Self::digest(&salt, password))
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        let Some((salt_hex, digest)) = stored.split_once('$') else {
            return false;
        };
        let Ok(salt) = hex::decode(salt_hex) else {
            return false;
        };
        let expected = Self::digest(&salt, password);

        // constant-time compare
        expected.len() == digest.len()
            && expected
                .bytes()
                .zip(digest.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
}

/// Caller session; anonymous until a login succeeds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    principal: Option<Principal>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn logout(&mut self) {
        self.principal = None;
    }
}

/// Gate for operations that need a logged-in user
pub trait AuthProvider: Send + Sync {
    fn require_authenticated_user(&self, session: &Session) -> BusinessResult<UserId>;
}

/// Accepts any session carrying a principal
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAuth;

impl AuthProvider for SessionAuth {
    fn require_authenticated_user(&self, session: &Session) -> BusinessResult<UserId> {
        session
            .principal()
            .map(|p| p.user_id)
            .ok_or(BusinessError::Unauthenticated)
    }
}
