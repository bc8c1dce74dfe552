//! Shared key generation for storage backends.
//!
//! Key format: `users/{user}/{tier folder}/{filename}`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use profego_core::Tier;

use crate::traits::{StorageError, StorageResult};

const USERS_ROOT: &str = "users";

/// Bytes left as-is in a user segment; everything else, `%` included, is percent-encoded.
const USER_SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'.')
    .remove(b'_')
    .remove(b'-');

/// Turn a user identity (an email address) into a single safe key segment.
///
/// Lowercases (emails are case-insensitive at the identity provider) and percent-encodes
/// every byte outside `[A-Za-z0-9@._-]`, so distinct identities never share a segment.
pub fn user_segment(user: &str) -> StorageResult<String> {
    let trimmed = user.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidKey("Empty user identity".to_string()));
    }
    let segment = utf8_percent_encode(&trimmed.to_lowercase(), USER_SEGMENT_ENCODE_SET).to_string();
    if segment.chars().all(|c| c == '.') {
        return Err(StorageError::InvalidKey(format!(
            "Invalid user identity: {}",
            user
        )));
    }
    Ok(segment)
}

/// Reject logical names that could escape their folder.
pub fn validate_filename(filename: &str) -> StorageResult<()> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains('/')
        || filename.contains('\\')
        || filename.chars().any(|c| c.is_control())
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid file name: {}",
            filename
        )));
    }
    Ok(())
}

/// Prefix holding everything a user owns: `users/{user}`.
pub fn user_prefix(user: &str) -> StorageResult<String> {
    Ok(format!("{}/{}", USERS_ROOT, user_segment(user)?))
}

/// Prefix of one tier for a user: `users/{user}/{folder}/`.
pub fn tier_prefix(user: &str, tier: Tier) -> StorageResult<String> {
    Ok(format!("{}/{}/", user_prefix(user)?, tier.folder()))
}

/// Full key of an artifact.
pub fn artifact_key(user: &str, tier: Tier, filename: &str) -> StorageResult<String> {
    validate_filename(filename)?;
    Ok(format!("{}{}", tier_prefix(user, tier)?, filename))
}
