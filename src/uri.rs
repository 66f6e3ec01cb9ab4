//! Path validation and path-identifier derivation.
//!
//! Every public path argument must carry an explicit storage-protocol prefix
//! (`s3://`, `hdfs://`, ...). Pages and chunks of a file are addressed on the
//! worker side by a stable hash-derived identifier of the full path; identical
//! paths must map to identical identifiers within a process so that worker
//! caches key consistently.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Validate that `path` is a full path with a storage-protocol prefix.
///
/// The accepted shape is `^[A-Za-z0-9]+://`. Violations are rejected locally,
/// before any network call is made.
pub fn validate_path(path: &str) -> Result<()> {
    let scheme_len = path
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if scheme_len > 0 && path[scheme_len..].starts_with("://") {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "path must be a full path with a protocol (e.g., 'protocol://path'), got: {path}"
        )))
    }
}

/// Derive the stable path identifier embedded in page and chunk URLs.
///
/// Hash functions are tried in order of strength: SHA-256, then MD5, then a
/// last-resort XxHash64 of the string. The first digest produced wins and is
/// rendered as lowercase hex. The identifier is stable within a process;
/// processes falling back to different tiers may disagree, which the worker
/// protocol tolerates.
pub fn path_hash(path: &str) -> String {
    if let Some(digest) = sha256_hex(path) {
        return digest;
    }
    if let Some(digest) = md5_hex(path) {
        return digest;
    }
    xxhash_hex(path)
}

fn sha256_hex(path: &str) -> Option<String> {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

fn md5_hex(path: &str) -> Option<String> {
    Some(hex::encode(md5::compute(path.as_bytes()).0))
}

fn xxhash_hex(path: &str) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(path.as_bytes());
    format!("{:x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_full_path() {
        assert!(validate_path("s3://bucket/key").is_ok());
        assert!(validate_path("hdfs://namenode/dir/file").is_ok());
        assert!(validate_path("file123://x").is_ok());
    }

    #[test]
    fn test_validate_rejects_relative_path() {
        assert!(matches!(
            validate_path("relative/path"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_scheme() {
        assert!(validate_path("://path").is_err());
        assert!(validate_path("/absolute/path").is_err());
        assert!(validate_path("").is_err());
        assert!(validate_path("s3:/bucket").is_err());
        assert!(validate_path("s3-x://bucket").is_err());
    }

    #[test]
    fn test_path_hash_is_lowercase_hex() {
        let id = path_hash("s3://bucket/key");
        assert!(!id.is_empty());
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_path_hash_deterministic() {
        assert_eq!(path_hash("s3://bucket/key"), path_hash("s3://bucket/key"));
        assert_ne!(path_hash("s3://bucket/a"), path_hash("s3://bucket/b"));
    }

    #[test]
    fn test_path_hash_is_sha256() {
        // First tier of the fallback chain is SHA-256 of the UTF-8 path.
        let mut hasher = Sha256::new();
        hasher.update("s3://bucket/key".as_bytes());
        let expected = hex::encode(hasher.finalize());
        assert_eq!(path_hash("s3://bucket/key"), expected);
    }
}
