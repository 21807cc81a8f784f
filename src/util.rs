//! Canonical byte encoding for keys and identifiers

/// Canonical bytes of an optional text value.
///
/// Missing, empty and whitespace-only values all encode to no bytes, so they
/// contribute nothing to a digest.
pub fn key_bytes(value: Option<&str>) -> Vec<u8> {
    match value {
        Some(text) => text.trim().as_bytes().to_vec(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bytes_canonicalizes_blank_values() {
        assert!(key_bytes(None).is_empty());
        assert!(key_bytes(Some("")).is_empty());
        assert!(key_bytes(Some("  \t")).is_empty());
        assert_eq!(key_bytes(Some(" a@b.com ")), b"a@b.com".to_vec());
    }

    #[test]
    fn test_key_bytes_is_utf8() {
        assert_eq!(key_bytes(Some("Müller")), "Müller".as_bytes().to_vec());
    }
}
