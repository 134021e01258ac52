use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// One-way credential hashing. One production implementation (argon2) and
/// one fast test double; the service depends only on the trait.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plain: &str) -> anyhow::Result<String>;
    /// A stored hash that fails to parse verifies as "no match" rather than
    /// surfacing a distinct error to the caller.
    fn verify(&self, hash: &str, plain: &str) -> bool;
}

pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, hash: &str, plain: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "malformed stored password hash");
                return false;
            }
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
pub struct PlainHasher;

#[cfg(test)]
impl CredentialHasher for PlainHasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        Ok(format!("plain:{plain}"))
    }

    fn verify(&self, hash: &str, plain: &str) -> bool {
        hash == format!("plain:{plain}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = Argon2Hasher.hash(password).expect("hashing should succeed");
        assert!(Argon2Hasher.verify(&hash, password));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = Argon2Hasher.hash(password).expect("hashing should succeed");
        assert!(!Argon2Hasher.verify(&hash, "wrong-password"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = Argon2Hasher.hash("pw1").unwrap();
        let b = Argon2Hasher.hash("pw1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_no_match() {
        assert!(!Argon2Hasher.verify("not-a-valid-hash", "anything"));
    }
}
