use tokio::task;

use crate::errors::Result;

/// Work factor used for every stored hash.
pub const PASSWORD_COST: u32 = 10;

/// bcrypt wrapper. Hashing is CPU-bound, so both directions run on the
/// blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self { cost: PASSWORD_COST }
    }

    /// Lower costs keep test suites fast. bcrypt rejects anything under 4.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, plaintext: &str) -> Result<String> {
        let plaintext = plaintext.to_string();
        let cost = self.cost;
        let digest = task::spawn_blocking(move || bcrypt::hash(plaintext, cost)).await??;
        Ok(digest)
    }

    /// Fails closed: a malformed digest yields `false`.
    pub async fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();
        match task::spawn_blocking(move || bcrypt::verify(plaintext, &digest)).await {
            Ok(Ok(matched)) => matched,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "password verification against malformed hash");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "password verification task failed");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
