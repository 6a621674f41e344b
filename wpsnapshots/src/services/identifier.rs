// File: wpsnapshots/src/services/identifier.rs
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of a snapshot identifier in hex characters (128 bits).
pub const ID_LEN: usize = 32;

/// Generate a new snapshot identifier.
///
/// Two v4 UUIDs supply 244 bits of OS randomness; hashing them together with
/// the current time and truncating to 128 bits gives a fixed-length lowercase
/// hex string that is safe to use as a directory name.
pub fn generate() -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(nanos.to_le_bytes());
    let digest = hasher.finalize();

    hex::encode(&digest[..ID_LEN / 2])
}

/// True when `id` has the shape produced by [`generate`].
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}
