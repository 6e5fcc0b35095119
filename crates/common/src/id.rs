//! ID and code generation utilities.

use rand::Rng;
use ulid::Ulid;
use uuid::Uuid;

/// Alphabet for human-typed codes. Omits 0/O and 1/I/L.
const MANUAL_CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Length of a manual attendance code.
pub const MANUAL_CODE_LEN: usize = 8;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are lexicographically sortable and shorter than UUIDs
    /// when represented as strings.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a random UUID v4 without hyphens, used as a nonce.
    #[must_use]
    pub fn generate_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Generate a manual attendance code, e.g. `K7QH3XPD`.
    #[must_use]
    pub fn generate_manual_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..MANUAL_CODE_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..MANUAL_CODE_ALPHABET.len());
                char::from(MANUAL_CODE_ALPHABET[idx])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_generate_token() {
        let id_gen = IdGenerator::new();
        assert_eq!(id_gen.generate_token().len(), 32);
    }

    #[test]
    fn test_manual_code_alphabet() {
        let id_gen = IdGenerator::new();
        for _ in 0..50 {
            let code = id_gen.generate_manual_code();
            assert_eq!(code.len(), MANUAL_CODE_LEN);
            assert!(code.bytes().all(|b| MANUAL_CODE_ALPHABET.contains(&b)));
        }
    }
}
