use chrono::Utc;

/// Length of an identifier in hex digits (12 bytes).
pub const ID_LEN: usize = 24;

/// Generate a new record identifier: 4 bytes of big-endian seconds
/// since the epoch followed by 8 random bytes, hex encoded.
pub fn generate_id() -> String {
    let mut bytes = [0u8; 12];

    let secs = Utc::now().timestamp() as u32;
    bytes[..4].copy_from_slice(&secs.to_be_bytes());

    let random = uuid::Uuid::new_v4();
    bytes[4..].copy_from_slice(&random.as_bytes()[..8]);

    hex::encode(bytes)
}

/// True if `id` has the shape of an identifier produced by `generate_id`.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id() {
        let a = generate_id();
        let b = generate_id();
        assert_eq!(a.len(), ID_LEN);
        assert!(is_valid_id(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("5d8a1f2e9c4b3a0012345678"));
        assert!(is_valid_id("5D8A1F2E9C4B3A0012345678"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("not-an-id"));
        assert!(!is_valid_id("5d8a1f2e9c4b3a001234567"));
        assert!(!is_valid_id("5d8a1f2e9c4b3a00123456789"));
        assert!(!is_valid_id("zz8a1f2e9c4b3a0012345678"));
    }
}
