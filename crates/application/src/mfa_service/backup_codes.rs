use subtle::ConstantTimeEq;

/// Generates ten random 8-digit numeric backup codes.
pub fn generate_backup_codes() -> Vec<String> {
    const CODE_COUNT: usize = 10;
    const CODE_LENGTH: usize = 8;

    let mut codes = Vec::with_capacity(CODE_COUNT);

    for _ in 0..CODE_COUNT {
        let mut bytes = [0u8; CODE_LENGTH];
        let _ = getrandom::getrandom(&mut bytes);

        let code: String = bytes
            .iter()
            .map(|byte| (b'0' + (*byte % 10)) as char)
            .collect();

        codes.push(code);
    }

    codes
}

/// Compares two backup codes for equality without leaking the position of
/// a mismatch through timing.
pub(super) fn codes_match(a: &str, b: &str) -> bool {
    a.trim().as_bytes().ct_eq(b.trim().as_bytes()).into()
}

/// Serializes a list of backup codes into the plaintext bundle format that
/// gets encrypted at rest: comma-joined codes.
pub(super) fn encode_bundle(codes: &[String]) -> Vec<u8> {
    codes.join(",").into_bytes()
}

/// Parses a decrypted backup-code bundle back into its code list.
pub(super) fn decode_bundle(bundle: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bundle);
    if text.is_empty() {
        return Vec::new();
    }
    text.split(',').map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_ten_eight_digit_codes() {
        let codes = generate_backup_codes();
        assert_eq!(codes.len(), 10);
        for code in &codes {
            assert_eq!(code.len(), 8);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn bundle_round_trips() {
        let codes = vec!["12345678".to_owned(), "87654321".to_owned()];
        let bundle = encode_bundle(&codes);
        assert_eq!(decode_bundle(&bundle), codes);
    }

    #[test]
    fn codes_match_is_order_independent_of_trailing_whitespace() {
        assert!(codes_match("12345678", " 12345678 "));
        assert!(!codes_match("12345678", "87654321"));
    }
}
