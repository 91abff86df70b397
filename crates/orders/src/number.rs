//! Order number generation.

use chrono::Utc;
use domain::OrderNumber;
use rand::Rng;

const TOKEN_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LEN: usize = 9;

/// Produces candidate order numbers.
///
/// Candidates need not be unique on their own: the store rejects duplicates
/// and the engine asks for a fresh one.
pub trait OrderNumberGenerator: Send + Sync {
    fn next_number(&self) -> OrderNumber;
}

/// `CMD-<epoch millis>-<9 random base-36 chars>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampOrderNumbers;

impl OrderNumberGenerator for TimestampOrderNumbers {
    fn next_number(&self) -> OrderNumber {
        let mut rng = rand::rng();
        let token: String = (0..TOKEN_LEN)
            .map(|_| char::from(TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())]))
            .collect();
        OrderNumber::compose(Utc::now().timestamp_millis(), &token)
    }
}
