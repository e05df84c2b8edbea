//! Salted password digests.
//!
//! Stored form: `sha256$<rounds>$<salt>$<digest>` with hex salt/digest.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

const SCHEME: &str = "sha256";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    rounds: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { rounds: 10_000 }
    }
}

impl PasswordHasher {
    pub fn new(rounds: u32) -> Self {
        Self { rounds: rounds.max(1) }
    }

    pub fn hash(&self, password: &str) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = derive(self.rounds, &salt, password);
        format!("{SCHEME}${}${salt}${}", self.rounds, hex::encode(digest))
    }

    /// `false` for a wrong password and for a malformed stored hash.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some(SCHEME), Some(rounds), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };
        let Ok(rounds) = rounds.parse::<u32>() else {
            return false;
        };
        let actual = hex::encode(derive(rounds.max(1), salt, password));
        actual.as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

fn derive(rounds: u32, salt: &str, password: &str) -> [u8; 32] {
    let mut digest: [u8; 32] = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize()
        .into();
    for _ in 1..rounds {
        digest = Sha256::new()
            .chain_update(digest)
            .chain_update(salt.as_bytes())
            .finalize()
            .into();
    }
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = PasswordHasher::new(10);
        let stored = hasher.hash("Password123!");
        assert!(stored.starts_with("sha256$10$"));
        assert!(hasher.verify("Password123!", &stored));
        assert!(!hasher.verify("password123!", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = PasswordHasher::new(1);
        assert_ne!(hasher.hash("same"), hasher.hash("same"));
    }

    #[test]
    fn malformed_stored_hashes_never_verify() {
        let hasher = PasswordHasher::default();
        assert!(!hasher.verify("x", ""));
        assert!(!hasher.verify("x", "plaintext"));
        assert!(!hasher.verify("x", "md5$1$salt$abcd"));
        assert!(!hasher.verify("x", "sha256$many$salt$abcd"));
    }

    #[test]
    fn digest_is_lowercase_hex_and_length_checked() {
        let hasher = PasswordHasher::new(2);
        let stored = hasher.hash("secret");
        let digest = stored.rsplit('$').next().unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));

        let truncated = &stored[..stored.len() - 2];
        assert!(!hasher.verify("secret", truncated));
    }
}
