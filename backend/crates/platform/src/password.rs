//! Password Hashing and Verification
//!
//! bcrypt-based password handling with:
//! - Work factor (cost) validation before any hashing takes place
//! - Standard `$2b$<cost>$<salt><digest>` encoding, readable by any bcrypt implementation
//! - Library-side constant-time comparison on verification
//! - Blocking-pool offload for async callers
//!
//! ## Backends
//! The bcrypt calls sit behind [`HashBackend`]. [`Bcrypt`] is the production
//! backend; tests swap in fakes to exercise cost validation and error mapping
//! without paying for the real algorithm.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use bcrypt::HashParts;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Smallest work factor bcrypt accepts
pub const MIN_COST: i32 = 4;

/// Largest work factor bcrypt accepts
pub const MAX_COST: i32 = 31;

/// Work factor used when none is configured
pub const DEFAULT_COST: i32 = 10;

/// bcrypt only consumes this many bytes of input
pub const MAX_PASSWORD_BYTES: usize = 72;

// ============================================================================
// Error Types
// ============================================================================

/// Password hashing errors
///
/// Verification has no error type: every failure reads as "no match".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordHashError {
    /// Cost factor outside `[MIN_COST, MAX_COST]`, rejected before hashing
    #[error("Invalid cost factor {cost} (must be between 4 and 31)")]
    InvalidCost { cost: i32 },

    /// The underlying hash computation failed
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
}

/// Error type returned by [`HashBackend`] implementations
pub type BackendError = Box<dyn Error + Send + Sync>;

/// Input longer than bcrypt can consume
#[derive(Debug, Error)]
#[error("password is {0} bytes, bcrypt accepts at most 72")]
pub struct PasswordTooLong(pub usize);

// ============================================================================
// Backend
// ============================================================================

/// The `{hash, compare}` capability a [`PasswordHasher`] delegates to
///
/// `cost` has already been validated when `hash` is called.
pub trait HashBackend: Send + Sync {
    /// Produce an encoded hash of `password` at the given cost
    fn hash(&self, password: &[u8], cost: u32) -> Result<String, BackendError>;

    /// Check `password` against an encoded hash
    fn verify(&self, password: &[u8], hash: &str) -> Result<bool, BackendError>;
}

/// bcrypt backend (the `bcrypt` crate)
///
/// Over-long passwords are rejected when hashing. Verification reads only the
/// first 72 bytes, so hashes stored by truncating implementations still match.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bcrypt;

impl Bcrypt {
    fn check_length(password: &[u8]) -> Result<(), PasswordTooLong> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordTooLong(password.len()));
        }
        Ok(())
    }
}

impl HashBackend for Bcrypt {
    fn hash(&self, password: &[u8], cost: u32) -> Result<String, BackendError> {
        Self::check_length(password)?;
        Ok(bcrypt::hash(password, cost)?)
    }

    fn verify(&self, password: &[u8], hash: &str) -> Result<bool, BackendError> {
        // bcrypt compares the digests in constant time
        Ok(bcrypt::verify(password, hash)?)
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Encoded bcrypt hash
///
/// Holds the full self-describing string (version, cost, salt, digest).
/// Values read back from storage are wrapped unchecked via `From<String>`;
/// a malformed value simply never verifies.
///
/// ## Examples
/// ```rust
/// use platform::password::{HashedPassword, PasswordHasher};
///
/// let hasher = PasswordHasher::default().with_cost(4).unwrap();
/// let hashed = hasher.hash("correct horse").unwrap();
///
/// let stored = hashed.as_str().to_string();
/// let restored = HashedPassword::from(stored);
/// assert!(restored.verify("correct horse"));
/// assert_eq!(restored.cost(), Some(4));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Encoded form for storage
    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// Work factor embedded in the encoding, `None` if it does not parse
    pub fn cost(&self) -> Option<u32> {
        hash_cost(&self.hash)
    }

    /// Verify a password against this hash with the bcrypt backend
    pub fn verify(&self, password: &str) -> bool {
        verify_password(password, &self.hash)
    }
}

impl From<String> for HashedPassword {
    fn from(hash: String) -> Self {
        Self { hash }
    }
}

impl AsRef<str> for HashedPassword {
    fn as_ref(&self) -> &str {
        &self.hash
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Hasher
// ============================================================================

/// Hashes and verifies passwords through a [`HashBackend`]
///
/// Stateless apart from its configured cost; cheap to clone and safe to share
/// between threads.
#[derive(Debug, Clone)]
pub struct PasswordHasher<B = Bcrypt> {
    backend: B,
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(Bcrypt)
    }
}

impl<B: HashBackend> PasswordHasher<B> {
    /// Hasher over `backend` using [`DEFAULT_COST`]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cost: DEFAULT_COST as u32,
        }
    }

    /// Replace the cost used by [`hash`](Self::hash)
    pub fn with_cost(mut self, cost: i32) -> Result<Self, PasswordHashError> {
        self.cost = validate_cost(cost)?;
        Ok(self)
    }

    /// Cost that already passed [`validate_cost`]
    pub(crate) fn with_validated_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash with the configured cost
    pub fn hash(&self, password: &str) -> Result<HashedPassword, PasswordHashError> {
        self.hash_validated(password, self.cost)
    }

    /// Hash with an explicit cost
    ///
    /// ## Errors
    /// * `InvalidCost` - `cost` outside `[MIN_COST, MAX_COST]`; nothing is hashed
    /// * `HashingFailed` - the backend failed (e.g. password over 72 bytes)
    pub fn hash_with_cost(
        &self,
        password: &str,
        cost: i32,
    ) -> Result<HashedPassword, PasswordHashError> {
        let cost = validate_cost(cost)?;
        self.hash_validated(password, cost)
    }

    fn hash_validated(&self, password: &str, cost: u32) -> Result<HashedPassword, PasswordHashError> {
        tracing::debug!(cost, "Hashing password");

        self.backend
            .hash(password.as_bytes(), cost)
            .map(HashedPassword::from)
            .map_err(|e| {
                tracing::warn!(cost, error = %e, "Password hashing failed");
                PasswordHashError::HashingFailed(e.to_string())
            })
    }

    /// Check a password against an encoded hash
    ///
    /// Returns `false` for a wrong password and for a malformed hash alike.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match self.backend.verify(password.as_bytes(), hash) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::debug!(error = %e, "Password verification rejected hash");
                false
            }
        }
    }

    /// Whether a stored hash should be replaced on next successful login
    ///
    /// True if the hash does not parse or was produced at a different cost
    /// than this hasher's.
    pub fn needs_rehash(&self, hash: &str) -> bool {
        hash_cost(hash) != Some(self.cost)
    }
}

impl<B: HashBackend + Clone + 'static> PasswordHasher<B> {
    /// [`hash`](Self::hash) on tokio's blocking pool
    pub async fn hash_async(&self, password: String) -> Result<HashedPassword, PasswordHashError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?
    }

    /// [`hash_with_cost`](Self::hash_with_cost) on tokio's blocking pool
    ///
    /// The cost is validated before a blocking task is spawned.
    pub async fn hash_with_cost_async(
        &self,
        password: String,
        cost: i32,
    ) -> Result<HashedPassword, PasswordHashError> {
        let cost = validate_cost(cost)?;
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash_validated(&password, cost))
            .await
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?
    }

    /// [`verify`](Self::verify) on tokio's blocking pool
    pub async fn verify_async(&self, password: String, hash: String) -> bool {
        let hasher = self.clone();
        match tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

// ============================================================================
// Free functions (bcrypt backend, default cost)
// ============================================================================

/// Hash with bcrypt at [`DEFAULT_COST`]
pub fn hash_password(password: &str) -> Result<HashedPassword, PasswordHashError> {
    PasswordHasher::default().hash(password)
}

/// Hash with bcrypt at `cost`
pub fn hash_password_with_cost(
    password: &str,
    cost: i32,
) -> Result<HashedPassword, PasswordHashError> {
    PasswordHasher::default().hash_with_cost(password, cost)
}

/// Verify with bcrypt; never fails, malformed hashes do not match
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHasher::default().verify(password, hash)
}

/// Check a cost factor against bcrypt's accepted range
pub fn validate_cost(cost: i32) -> Result<u32, PasswordHashError> {
    if !(MIN_COST..=MAX_COST).contains(&cost) {
        return Err(PasswordHashError::InvalidCost { cost });
    }
    Ok(cost as u32)
}

/// Decode the work factor from an encoded bcrypt hash
pub fn hash_cost(hash: &str) -> Option<u32> {
    HashParts::from_str(hash).ok().map(|parts| parts.get_cost())
}

// ============================================================================
// Tests
// ============================================================================
