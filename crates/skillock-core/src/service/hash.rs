//! ContentHasher trait for computing lockfile integrity strings.
//!
//! Defined in skillock-core so lockfile construction and verification can
//! hash skill content without coupling to a specific hashing crate. The
//! `Sha256ContentHasher` adapter lives in skillock-infra.

/// Abstraction over content hashing for integrity verification.
pub trait ContentHasher: Send + Sync {
    /// Algorithm tag used as the integrity prefix, e.g. `"sha256"`.
    fn algorithm(&self) -> &'static str;

    /// Compute a lowercase hex-encoded digest of the given bytes.
    fn compute_hash(&self, content: &[u8]) -> String;

    /// Integrity string in `<algorithm>:<hex digest>` form. Text content is
    /// hashed as its UTF-8 encoding.
    fn compute_integrity(&self, content: &[u8]) -> String {
        format!("{}:{}", self.algorithm(), self.compute_hash(content))
    }
}
