use rand::rngs::OsRng;
use rand::RngCore;
use tracing::error;

use crate::error::AuthError;

const TABLE: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Produces one-time verification codes and knows the retry budget a new
/// record starts with.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> Result<String, AuthError>;
    fn max_retries(&self) -> i32;
}

/// Uppercase A-Z codes sourced from the OS entropy pool. Refuses to return
/// anything if the entropy source cannot fill the buffer.
pub struct RandomCodeGenerator {
    length: usize,
    retries: i32,
}

impl RandomCodeGenerator {
    pub fn new(length: usize, retries: i32) -> Self {
        Self { length, retries }
    }
}

// Largest multiple of the alphabet size that fits in a byte; bytes at or
// above it are rejected so every letter is equally likely.
const ZONE: usize = 256 - 256 % TABLE.len();

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> Result<String, AuthError> {
        let mut code = String::with_capacity(self.length);
        let mut buf = [0u8; 64];
        while code.len() < self.length {
            OsRng.try_fill_bytes(&mut buf).map_err(|e| {
                error!(error = %e, "entropy source failure");
                AuthError::Entropy
            })?;
            for &b in buf.iter() {
                if (b as usize) < ZONE {
                    code.push(TABLE[b as usize % TABLE.len()] as char);
                    if code.len() == self.length {
                        break;
                    }
                }
            }
        }
        Ok(code)
    }

    fn max_retries(&self) -> i32 {
        self.retries
    }
}

#[cfg(test)]
pub struct FixedCodeGenerator {
    pub code: String,
    pub retries: i32,
}

#[cfg(test)]
impl CodeGenerator for FixedCodeGenerator {
    fn generate(&self) -> Result<String, AuthError> {
        Ok(self.code.clone())
    }

    fn max_retries(&self) -> i32 {
        self.retries
    }
}
