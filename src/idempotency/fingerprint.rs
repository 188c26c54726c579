use sha2::{Digest, Sha256};

/// Computes the fingerprint of a request body: SHA-256 over the raw bytes,
/// hex-encoded. Canonicalization is the caller's responsibility; two
/// logically identical payloads serialized differently hash differently.
pub fn fingerprint(raw_body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_body);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let body = br#"{"type":"payment","amount":12000,"consumerId":"2e37f6"}"#;
        assert_eq!(fingerprint(body), fingerprint(body));
    }

    #[test]
    fn test_fingerprint_is_sensitive_to_payload() {
        let a = fingerprint(br#"{"amount":12000}"#);
        let b = fingerprint(br#"{"amount":15000}"#);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_distinguishes_serializations() {
        // Same logical payload, different byte representation.
        let a = fingerprint(br#"{"amount":12000,"type":"payment"}"#);
        let b = fingerprint(br#"{"type":"payment","amount":12000}"#);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let hash = fingerprint(b"");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
