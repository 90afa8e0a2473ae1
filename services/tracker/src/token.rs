//! Identifier generation
//!
//! Pure value generation; none of these functions guarantee uniqueness.
//! Callers insert under a unique constraint and regenerate on collision,
//! giving up after [`MAX_GENERATE_ATTEMPTS`] so the loop provably
//! terminates even under adversarial store contents.

use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

const SHORT_TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SHORT_TOKEN_LEN: usize = 8;

/// Cap on regenerate-and-retry rounds for collision recovery.
pub const MAX_GENERATE_ATTEMPTS: u32 = 16;

/// Raised when the retry cap is exhausted without an unused identifier.
#[derive(Error, Debug)]
#[error("no unused identifier after {attempts} attempts")]
pub struct GenerationCollision {
    pub attempts: u32,
}

/// 8-character project identifier drawn from the uppercase alphanumeric
/// alphabet, uniformly random per character. Used for project UIDs and
/// link UIDs.
pub fn short_token() -> String {
    token_from(SHORT_TOKEN_ALPHABET, SHORT_TOKEN_LEN)
}

/// Per-visit masked token: a hyphenated v4 UUID (36 characters). The
/// only identifier ever exposed to external survey providers.
pub fn visit_token() -> String {
    Uuid::new_v4().to_string()
}

fn token_from(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn short_token_shape() {
        for _ in 0..200 {
            let token = short_token();
            assert_eq!(token.len(), 8);
            assert!(
                token.bytes().all(|b| SHORT_TOKEN_ALPHABET.contains(&b)),
                "unexpected character in {token}"
            );
        }
    }

    #[test]
    fn visit_token_is_a_hyphenated_v4_uuid() {
        for _ in 0..50 {
            let token = visit_token();
            assert_eq!(token.len(), 36);
            let parsed = Uuid::parse_str(&token).expect("not a uuid");
            assert_eq!(parsed.get_version_num(), 4);
        }
    }

    /// Mirror of the repository retry loop: generate, check existence,
    /// accept only an unused value, give up at the attempt cap.
    fn mint_unique(
        taken: &mut HashSet<String>,
        alphabet: &[u8],
        len: usize,
        max_attempts: u32,
    ) -> Option<String> {
        for _ in 0..max_attempts {
            let candidate = token_from(alphabet, len);
            if taken.insert(candidate.clone()) {
                return Some(candidate);
            }
        }
        None
    }

    #[test]
    fn reduced_space_stress_never_accepts_a_duplicate() {
        // Length-1 tokens over the 36-symbol alphabet: a 36-value space.
        // Pre-populate all but one value; minting must land on the single
        // free value, and once the space is full the bounded retry must
        // give up rather than accept a duplicate.
        let mut taken: HashSet<String> = SHORT_TOKEN_ALPHABET[..35]
            .iter()
            .map(|&b| (b as char).to_string())
            .collect();

        let minted = mint_unique(&mut taken, SHORT_TOKEN_ALPHABET, 1, 10_000)
            .expect("one value was still free");
        assert_eq!(minted, "9");
        assert_eq!(taken.len(), 36);

        for _ in 0..100 {
            assert_eq!(
                mint_unique(&mut taken, SHORT_TOKEN_ALPHABET, 1, MAX_GENERATE_ATTEMPTS),
                None
            );
            assert_eq!(taken.len(), 36, "a duplicate insert was accepted");
        }
    }

    #[test]
    fn full_length_tokens_do_not_collide_in_practice() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(short_token()));
        }
    }
}
