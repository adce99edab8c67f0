//! Guest entry codes
//!
//! Format `XXX-XXXXX`: eight characters drawn from an alphabet without the
//! visually ambiguous `O`, `0`, `I` and `1`.

use rand::Rng;

/// Characters used in event codes
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of code characters (excluding the hyphen)
pub const CODE_LENGTH: usize = 8;

/// Position of the hyphen in the formatted code
const SPLIT_AT: usize = 3;

/// Generate a random event code, e.g. `A3K-9P2QM`
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let raw: String = (0..CODE_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", &raw[..SPLIT_AT], &raw[SPLIT_AT..])
}

/// Check that a code is in canonical form
pub fn is_valid(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == CODE_LENGTH + 1
        && bytes[SPLIT_AT] == b'-'
        && bytes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != SPLIT_AT)
            .all(|(_, b)| ALPHABET.contains(b))
}

/// Canonicalize user-typed input
///
/// Accepts lower case, surrounding whitespace and a missing hyphen. Returns
/// `None` if the result is not a valid code.
pub fn normalize(input: &str) -> Option<String> {
    let compact: String = input
        .trim()
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if compact.len() != CODE_LENGTH || !compact.is_ascii() {
        return None;
    }
    let code = format!("{}-{}", &compact[..SPLIT_AT], &compact[SPLIT_AT..]);
    is_valid(&code).then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_valid() {
        for _ in 0..200 {
            let code = generate();
            assert!(is_valid(&code), "generated invalid code {}", code);
        }
    }

    #[test]
    fn test_ambiguous_characters_rejected() {
        assert!(is_valid("ABC-DEFGH"));
        assert!(!is_valid("AB0-DEFGH"));
        assert!(!is_valid("ABC-DEFGO"));
        assert!(!is_valid("1BC-DEFGH"));
        assert!(!is_valid("ABCDEFGH"));
    }

    #[test]
    fn test_normalize_is_case_insensitive() {
        assert_eq!(normalize("a3k-9p2qm").as_deref(), Some("A3K-9P2QM"));
        assert_eq!(normalize(" A3K9P2QM ").as_deref(), Some("A3K-9P2QM"));
        assert_eq!(normalize("a3k 9p2qm").as_deref(), Some("A3K-9P2QM"));
    }

    #[test]
    fn test_normalize_rejects_bad_input() {
        assert!(normalize("").is_none());
        assert!(normalize("A3K-9P2Q").is_none());
        assert!(normalize("OOO-00000").is_none());
        assert!(normalize("ÄBC-DEFGH").is_none());
    }
}
